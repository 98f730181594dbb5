//! Column standardization fitted on training data.
//!
//! x_scaled = (x - mean) / std, with the sample standard deviation. Columns
//! with (near) zero spread keep a scale of 1 so they map to a constant
//! rather than to NaN.

use crate::error::{DemandError, Result};
use serde::{Deserialize, Serialize};

/// Center and scale of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    /// Mean of the fitted values
    pub center: f64,
    /// Standard deviation of the fitted values (1.0 if degenerate)
    pub scale: f64,
}

impl ScaleParams {
    /// Mean and sample standard deviation of `values`.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                center: 0.0,
                scale: 1.0,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let variance = if values.len() > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let std = variance.sqrt();

        Self {
            center: mean,
            scale: if std < 1e-10 { 1.0 } else { std },
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        (x - self.center) / self.scale
    }

    pub fn invert(&self, z: f64) -> f64 {
        z * self.scale + self.center
    }
}

/// Per-column standardization for row-major feature matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<ScaleParams>,
}

impl StandardScaler {
    /// Fit one `ScaleParams` per column of `rows`.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| DemandError::EmptyData("cannot fit scaler on zero rows".to_string()))?;

        let mut column = Vec::with_capacity(rows.len());
        let mut columns = Vec::with_capacity(width);
        for j in 0..width {
            column.clear();
            for row in rows {
                if row.len() != width {
                    return Err(DemandError::DimensionMismatch {
                        expected: width,
                        got: row.len(),
                    });
                }
                column.push(row[j]);
            }
            columns.push(ScaleParams::fit(&column));
        }

        Ok(Self { columns })
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn params(&self) -> &[ScaleParams] {
        &self.columns
    }

    /// Scale one row with the fitted parameters.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.columns.len() {
            return Err(DemandError::DimensionMismatch {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.columns.iter())
            .map(|(&x, p)| p.apply(x))
            .collect())
    }
}
