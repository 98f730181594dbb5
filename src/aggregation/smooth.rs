//! Causal exponentially weighted smoothing of demand series.
//!
//! `s[0] = x[0]`, `s[i] = alpha * x[i] + (1 - alpha) * s[i-1]` with
//! `alpha = 2 / (span + 1)`. Each output depends only on inputs at or before
//! its own position. All functions return new vectors and leave their input
//! untouched, so a series can be re-smoothed with another span at any time.

use crate::core::{DemandPanel, DemandSeries, RegionId};
use crate::error::{DemandError, Result};
use rayon::prelude::*;

/// Smoothing factor for a span-based EWMA; `span` must be at least 1.
pub fn span_to_alpha(span: f64) -> Result<f64> {
    if !span.is_finite() || span < 1.0 {
        return Err(DemandError::InvalidParameter(format!(
            "EWMA span must be >= 1, got {span}"
        )));
    }
    Ok(2.0 / (span + 1.0))
}

/// Exponentially weighted moving average, left to right.
pub fn ewma(values: &[f64], span: f64) -> Result<Vec<f64>> {
    let alpha = span_to_alpha(span)?;
    let Some(&first) = values.first() else {
        return Ok(Vec::new());
    };

    let mut result = Vec::with_capacity(values.len());
    let mut s = first;
    result.push(s);
    for &x in &values[1..] {
        s = alpha * x + (1.0 - alpha) * s;
        result.push(s);
    }
    Ok(result)
}

/// Smooth one region's counts.
pub fn smooth_series(series: &DemandSeries, span: f64) -> Result<Vec<f64>> {
    ewma(&series.values(), span)
}

/// Smoothed values for every region of a panel, in panel order.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedPanel {
    span: f64,
    regions: Vec<RegionId>,
    values: Vec<Vec<f64>>,
}

impl SmoothedPanel {
    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn get(&self, region: RegionId) -> Option<&[f64]> {
        self.regions
            .binary_search(&region)
            .ok()
            .map(|i| self.values[i].as_slice())
    }

    /// Smoothed values aligned with `DemandPanel::series()`.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }
}

/// Smooth every region independently; regions run in parallel, buckets within
/// a region strictly in order.
pub fn smooth_panel(panel: &DemandPanel, span: f64) -> Result<SmoothedPanel> {
    span_to_alpha(span)?;
    let values = panel
        .series()
        .par_iter()
        .map(|s| smooth_series(s, span))
        .collect::<Result<Vec<_>>>()?;
    Ok(SmoothedPanel {
        span,
        regions: panel.regions(),
        values,
    })
}
