//! Smoothed-demand baseline.
//!
//! Predicts each row's causal EWMA value. It has nothing to learn, which
//! makes it the yardstick the regression model has to beat.

use super::traits::DemandPredictor;
use crate::error::{DemandError, Result};
use crate::features::FeatureRow;

#[derive(Debug, Clone, Default)]
pub struct SmoothedBaseline;

impl SmoothedBaseline {
    pub fn new() -> Self {
        Self
    }
}

impl DemandPredictor for SmoothedBaseline {
    fn fit(&mut self, _train: &[FeatureRow]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        rows.iter()
            .map(|row| {
                if row.smoothed.is_finite() {
                    Ok(row.smoothed.max(0.0))
                } else {
                    Err(DemandError::SchemaMismatch {
                        row: row.identity(),
                        detail: "smoothed demand is not finite".to_string(),
                    })
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "SmoothedBaseline"
    }

    fn is_fitted(&self) -> bool {
        true
    }
}
