//! Ridge (L2-regularized least squares) regression.
//!
//! Solves `(X'X + alpha * P) beta = X'y` by Cholesky decomposition, where the
//! design has a leading column of ones and `P` is the identity with the
//! intercept entry zeroed, so the intercept is never shrunk.

use crate::error::{DemandError, Result};
use serde::{Deserialize, Serialize};

/// Added to the diagonal for numerical stability.
const JITTER: f64 = 1e-8;

/// Fitted ridge coefficients and intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub alpha: f64,
}

impl RidgeFit {
    pub fn num_features(&self) -> usize {
        self.coefficients.len()
    }

    /// intercept + sum(coef_j * x_j)
    pub fn predict_row(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.coefficients.len() {
            return Err(DemandError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: x.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(x.iter())
                .map(|(b, xi)| b * xi)
                .sum::<f64>())
    }
}

/// Fit `y = intercept + X @ coefficients` with an L2 penalty of `alpha`.
///
/// # Arguments
/// * `x` - Row-major design matrix without the intercept column
/// * `y` - Target values, one per row
/// * `alpha` - Regularization strength (>= 0)
pub fn ridge_fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<RidgeFit> {
    let n = y.len();
    if n == 0 {
        return Err(DemandError::InsufficientData { needed: 1, got: 0 });
    }
    if x.len() != n {
        return Err(DemandError::DimensionMismatch {
            expected: n,
            got: x.len(),
        });
    }
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(DemandError::InvalidParameter(format!(
            "ridge alpha must be a non-negative number, got {alpha}"
        )));
    }

    let k = x[0].len();
    let num_params = k + 1;

    // X'X and X'y with an implicit leading column of ones
    let mut xtx = vec![vec![0.0; num_params]; num_params];
    let mut xty = vec![0.0; num_params];

    for (row, &y_obs) in x.iter().zip(y.iter()) {
        if row.len() != k {
            return Err(DemandError::DimensionMismatch {
                expected: k,
                got: row.len(),
            });
        }

        xtx[0][0] += 1.0;
        xty[0] += y_obs;
        for i in 0..k {
            let xi = row[i];
            xtx[0][i + 1] += xi;
            xtx[i + 1][0] += xi;
            xty[i + 1] += xi * y_obs;
            for j in 0..=i {
                xtx[i + 1][j + 1] += xi * row[j];
            }
        }
    }

    // Mirror the lower triangle and apply the penalty
    for i in 1..num_params {
        for j in 1..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += alpha;
    }
    for i in 0..num_params {
        xtx[i][i] += JITTER;
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        DemandError::ComputationError(
            "ridge regression failed: normal equations not positive definite".into(),
        )
    })?;

    Ok(RidgeFit {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
        alpha,
    })
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Solves A @ x = b where A is symmetric positive definite.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}
