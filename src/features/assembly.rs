//! Feature matrix assembly.
//!
//! One [`FeatureRow`] per (region, bucket). For the bucket at position `i`
//! with horizon `h`:
//!
//! - label: raw count at `i + h`
//! - lags: raw counts at `i - 1, i - 2, ..., i - lag_window`
//! - smoothed: EWMA at `i` when `h = 1`, at `i - 1` when `h = 0`
//! - temporal features of bucket `i`
//!
//! Rows whose history would reach before the start of the series are
//! dropped and counted, never zero-padded.

use super::temporal::TemporalFeatures;
use crate::aggregation::{smooth_panel, span_to_alpha};
use crate::config::PipelineConfig;
use crate::core::{DemandPanel, DemandSeries, RegionId, TimeBucket};
use crate::error::{DemandError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Engineered features for one (region, bucket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub region: RegionId,
    pub bucket: TimeBucket,
    pub temporal: TemporalFeatures,
    pub smoothed: f64,
    /// `lags[k - 1]` is the count `k` buckets before `bucket`
    pub lags: Vec<f64>,
    /// Count to predict; `None` when the target bucket is not yet observed
    pub label: Option<f64>,
}

impl FeatureRow {
    /// Human-readable identity used in error reports.
    pub fn identity(&self) -> String {
        format!("region {} @ {}", self.region, self.bucket.to_rfc3339())
    }

    /// Label, or `SchemaMismatch` if the row has none.
    pub fn require_label(&self) -> Result<f64> {
        self.label.ok_or_else(|| DemandError::SchemaMismatch {
            row: self.identity(),
            detail: "missing label".to_string(),
        })
    }
}

/// Rows produced by assembly plus what was left out.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub rows: Vec<FeatureRow>,
    /// Buckets skipped because their lag window reaches before the series start
    pub dropped_insufficient_history: usize,
    /// Buckets skipped because the target bucket lies past the end of the data
    pub unlabeled: usize,
}

/// Builds feature rows from a demand panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureAssembler {
    lag_window: usize,
    horizon: usize,
    ewma_span: f64,
}

impl FeatureAssembler {
    pub fn new(lag_window: usize, horizon: usize, ewma_span: f64) -> Result<Self> {
        if horizon > 1 {
            return Err(DemandError::InvalidParameter(format!(
                "horizon must be 0 or 1, got {horizon}"
            )));
        }
        span_to_alpha(ewma_span)?;
        Ok(Self {
            lag_window,
            horizon,
            ewma_span,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.lag_window, config.horizon, config.ewma_span)
    }

    pub fn lag_window(&self) -> usize {
        self.lag_window
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn ewma_span(&self) -> f64 {
        self.ewma_span
    }

    /// Earliest bucket position that has a full history window.
    pub fn min_history(&self) -> usize {
        let smoothing_lag = if self.horizon == 0 { 1 } else { 0 };
        self.lag_window.max(smoothing_lag)
    }

    /// Assemble rows for every region, in region then bucket order.
    pub fn assemble(&self, panel: &DemandPanel) -> Result<Assembly> {
        let smoothed = smooth_panel(panel, self.ewma_span)?;

        let per_region = panel
            .series()
            .par_iter()
            .zip(smoothed.values().par_iter())
            .map(|(series, smooth)| self.assemble_series(series, smooth))
            .collect::<Result<Vec<_>>>()?;

        let mut assembly = Assembly::default();
        for part in per_region {
            assembly.rows.extend(part.rows);
            assembly.dropped_insufficient_history += part.dropped_insufficient_history;
            assembly.unlabeled += part.unlabeled;
        }

        if assembly.dropped_insufficient_history > 0 {
            log::debug!(
                "dropped {} rows with insufficient history (lag_window={}, horizon={})",
                assembly.dropped_insufficient_history,
                self.lag_window,
                self.horizon
            );
        }
        log::info!(
            "assembled {} feature rows from {} regions",
            assembly.rows.len(),
            panel.n_regions()
        );

        Ok(assembly)
    }

    fn assemble_series(&self, series: &DemandSeries, smoothed: &[f64]) -> Result<Assembly> {
        let values = series.values();
        let mut assembly = Assembly::default();

        for i in 0..values.len() {
            if i + self.horizon >= values.len() {
                assembly.unlabeled += 1;
            } else if i < self.min_history() {
                assembly.dropped_insufficient_history += 1;
            } else {
                let row = self.build_row(series, &values, smoothed, i)?;
                assembly.rows.push(row);
            }
        }

        Ok(assembly)
    }

    /// Row for the bucket at `index`, with a label if the target bucket is observed.
    ///
    /// `index` may be one past the end of the series when the horizon is 0,
    /// since such rows only read earlier buckets. Returns `None` when the
    /// history window is incomplete or the features would read past the end.
    pub fn row_at(
        &self,
        series: &DemandSeries,
        smoothed: &[f64],
        index: usize,
    ) -> Result<Option<FeatureRow>> {
        if smoothed.len() != series.len() {
            return Err(DemandError::DimensionMismatch {
                expected: series.len(),
                got: smoothed.len(),
            });
        }
        let readable = if self.horizon == 0 {
            index <= series.len()
        } else {
            index < series.len()
        };
        if index < self.min_history() || !readable {
            return Ok(None);
        }
        let values = series.values();
        self.build_row(series, &values, smoothed, index).map(Some)
    }

    fn build_row(
        &self,
        series: &DemandSeries,
        values: &[f64],
        smoothed: &[f64],
        index: usize,
    ) -> Result<FeatureRow> {
        let bucket = series.bucket(index);
        let smoothed_at = if self.horizon == 0 { index - 1 } else { index };
        let lags = (1..=self.lag_window).map(|k| values[index - k]).collect();
        let label = values.get(index + self.horizon).copied();

        Ok(FeatureRow {
            region: series.region(),
            bucket,
            temporal: TemporalFeatures::from_timestamp(bucket)?,
            smoothed: smoothed[smoothed_at],
            lags,
            label,
        })
    }
}
