//! Utility functions shared by the models and evaluator.

pub mod metrics;

pub use metrics::{calculate_metrics, RegressionMetrics};
