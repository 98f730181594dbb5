//! Accuracy metrics for demand evaluation.

use crate::error::{DemandError, Result};
use serde::{Deserialize, Serialize};

/// Regression accuracy metrics over a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// R-squared (coefficient of determination)
    pub r_squared: f64,
    /// Number of scored predictions
    pub n: usize,
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// When every actual value is identical R-squared is 1.0 for a perfect fit
/// and 0.0 otherwise.
///
/// # Arguments
/// * `actual` - Observed demand
/// * `predicted` - Predicted demand
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<RegressionMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(DemandError::EmptyData("no predictions to score".into()));
    }

    if actual.len() != predicted.len() {
        return Err(DemandError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;

    // MAE
    let mae: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;

    // MSE
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let mse = ss_res / n;

    // RMSE
    let rmse = mse.sqrt();

    // R-squared
    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let r_squared = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(RegressionMetrics {
        mae,
        mse,
        rmse,
        r_squared,
        n: actual.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn calculate_metrics_perfect_prediction() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        let metrics = calculate_metrics(&actual, &predicted).unwrap();

        assert_relative_eq!(metrics.mae, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.r_squared, 1.0, epsilon = 1e-10);
        assert_eq!(metrics.n, 5);
    }

    #[test]
    fn calculate_metrics_known_values() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![1.5, 2.5, 2.5, 4.5, 4.5];
        // Errors: 0.5, 0.5, 0.5, 0.5, 0.5

        let metrics = calculate_metrics(&actual, &predicted).unwrap();

        assert_relative_eq!(metrics.mae, 0.5, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.25, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.5, epsilon = 1e-10);
        // ss_tot = 10, ss_res = 1.25
        assert_relative_eq!(metrics.r_squared, 0.875, epsilon = 1e-10);
    }

    #[test]
    fn constant_actuals() {
        let exact = calculate_metrics(&[2.0, 2.0, 2.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_relative_eq!(exact.r_squared, 1.0);

        let off = calculate_metrics(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(off.r_squared, 0.0);
    }

    #[test]
    fn calculate_metrics_dimension_mismatch() {
        let result = calculate_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(DemandError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn calculate_metrics_empty_data() {
        let result = calculate_metrics(&[], &[]);
        assert!(matches!(result, Err(DemandError::EmptyData(_))));
    }

    #[test]
    fn r_squared_negative_for_poor_model() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![5.0, 4.0, 3.0, 2.0, 1.0]; // Inverted

        let metrics = calculate_metrics(&actual, &predicted).unwrap();

        assert!(metrics.r_squared < 0.0); // Worse than mean prediction
    }
}
