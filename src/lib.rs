//! # rideshare-demand
//!
//! Short-horizon ride-hailing demand forecasting over pickup regions.
//!
//! Pickups are clustered into regions with mini-batch k-means, counted per
//! region and fixed-width time bucket, smoothed with an EWMA, and turned
//! into lagged feature rows. A ridge regression over scaled numeric and
//! one-hot categorical features is trained on a chronological split and
//! evaluated against the smoothed baseline. The fitted model persists as a
//! versioned JSON artifact that answers per-location prediction requests.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod aggregation;
pub mod clustering;
pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{DemandError, Result};

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Coordinate, DemandPanel, TripBatch, TripRecord};
    pub use crate::error::{DemandError, Result};
    pub use crate::models::{DemandPredictor, FittedModel};
    pub use crate::pipeline::{DemandPipeline, PredictionRequest};
    pub use crate::utils::RegressionMetrics;
}
