//! Pipeline configuration.
//!
//! One `PipelineConfig` value is passed to every stage; nothing is read from
//! global state. Every field has a default, so a TOML file only needs the
//! options it changes:
//!
//! ```
//! use rideshare_demand::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_toml_str("k_regions = 8\nlag_window = 3").unwrap();
//! assert_eq!(config.k_regions, 8);
//! assert_eq!(config.bucket_width_minutes, 15);
//! ```

use crate::aggregation::DEFAULT_MAX_BUCKETS;
use crate::core::{BoundingBox, BucketWidth};
use crate::error::{DemandError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mini-batch clustering knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Coordinates sampled per mini-batch step
    pub batch_size: usize,
    /// Maximum number of mini-batch steps
    pub max_iter: usize,
    /// Stop once no centroid moves further than this (degrees)
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            max_iter: 100,
            tolerance: 1e-6,
        }
    }
}

/// Configuration for a full training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of spatial regions
    pub k_regions: usize,
    /// Aggregation granularity
    pub bucket_width_minutes: u32,
    /// EWMA span; `alpha = 2 / (span + 1)`
    pub ewma_span: f64,
    /// Number of lagged counts per row
    pub lag_window: usize,
    /// Fraction of distinct buckets used for training
    pub train_fraction: f64,
    /// L2 regularization strength
    pub ridge_alpha: f64,
    /// Seed for clustering; `None` draws from OS entropy
    pub random_seed: Option<u64>,
    /// Label offset in buckets: 1 predicts the next bucket, 0 the current one
    pub horizon: usize,
    /// Service area; trips outside are rejected
    pub bounding_box: BoundingBox,
    /// Longest history, in buckets, the aggregator will allocate
    pub max_buckets: usize,
    pub clustering: ClusteringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            k_regions: 20,
            bucket_width_minutes: 15,
            ewma_span: 4.0,
            lag_window: 4,
            train_fraction: 0.8,
            ridge_alpha: 1.0,
            random_seed: Some(42),
            horizon: 1,
            bounding_box: BoundingBox::default(),
            max_buckets: DEFAULT_MAX_BUCKETS,
            clustering: ClusteringConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| DemandError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DemandError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set number of regions.
    pub fn k_regions(mut self, k: usize) -> Self {
        self.k_regions = k;
        self
    }

    /// Set bucket width in minutes.
    pub fn bucket_width_minutes(mut self, minutes: u32) -> Self {
        self.bucket_width_minutes = minutes;
        self
    }

    /// Set EWMA span.
    pub fn ewma_span(mut self, span: f64) -> Self {
        self.ewma_span = span;
        self
    }

    /// Set lag window length.
    pub fn lag_window(mut self, lags: usize) -> Self {
        self.lag_window = lags;
        self
    }

    /// Set chronological train fraction.
    pub fn train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    /// Set ridge regularization strength.
    pub fn ridge_alpha(mut self, alpha: f64) -> Self {
        self.ridge_alpha = alpha;
        self
    }

    /// Set clustering seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Clear the clustering seed (non-deterministic regions).
    pub fn unseeded(mut self) -> Self {
        self.random_seed = None;
        self
    }

    /// Set label horizon (0 or 1).
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the service area.
    pub fn bounding_box(mut self, bounds: BoundingBox) -> Self {
        self.bounding_box = bounds;
        self
    }

    /// Set the longest history span in buckets.
    pub fn max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets;
        self
    }

    pub fn bucket_width(&self) -> Result<BucketWidth> {
        BucketWidth::from_minutes(self.bucket_width_minutes)
    }

    /// Reject configurations no stage could run with.
    pub fn validate(&self) -> Result<()> {
        if self.k_regions == 0 {
            return Err(DemandError::InvalidParameter(
                "k_regions must be at least 1".to_string(),
            ));
        }
        self.bucket_width()?;
        if !self.ewma_span.is_finite() || self.ewma_span < 1.0 {
            return Err(DemandError::InvalidParameter(format!(
                "ewma_span must be >= 1, got {}",
                self.ewma_span
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(DemandError::InvalidParameter(format!(
                "train_fraction must lie in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if !self.ridge_alpha.is_finite() || self.ridge_alpha < 0.0 {
            return Err(DemandError::InvalidParameter(format!(
                "ridge_alpha must be a non-negative number, got {}",
                self.ridge_alpha
            )));
        }
        if self.horizon > 1 {
            return Err(DemandError::InvalidParameter(format!(
                "horizon must be 0 or 1, got {}",
                self.horizon
            )));
        }
        if self.max_buckets == 0 {
            return Err(DemandError::InvalidParameter(
                "max_buckets must be at least 1".to_string(),
            ));
        }
        if self.clustering.batch_size == 0 || self.clustering.max_iter == 0 {
            return Err(DemandError::InvalidParameter(
                "clustering batch_size and max_iter must be positive".to_string(),
            ));
        }
        self.bounding_box.validate()
    }
}
