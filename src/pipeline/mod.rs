//! Training runs and request-time prediction.
//!
//! [`DemandPipeline::run`] takes raw trips through screening, region
//! fitting, aggregation, feature assembly, a chronological split, model
//! fitting and evaluation against the smoothed baseline. The resulting
//! [`FittedModel`](crate::models::FittedModel) answers
//! [`PredictionRequest`]s given a recent [`DemandPanel`](crate::core::DemandPanel).

pub mod request;
pub mod training;

pub use request::{predict_request, Location, Prediction, PredictionRequest};
pub use training::{DemandPipeline, RunSummary, TrainingOutcome};
