//! Predictor trait shared by the demand model and baselines.

use crate::error::Result;
use crate::features::FeatureRow;

/// Common interface for anything that maps feature rows to demand.
///
/// This trait is object-safe and can be used with `Box<dyn DemandPredictor>`.
pub trait DemandPredictor {
    /// Fit the predictor to labelled training rows.
    fn fit(&mut self, train: &[FeatureRow]) -> Result<()>;

    /// Predict demand for each row; predictions are never negative.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>>;

    /// Get the predictor name.
    fn name(&self) -> &str;

    /// Check if the predictor has been fitted.
    fn is_fitted(&self) -> bool;
}
