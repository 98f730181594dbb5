//! Demand aggregation and causal smoothing.

pub mod aggregate;
pub mod smooth;

pub use aggregate::{aggregate, aggregate_within, DEFAULT_MAX_BUCKETS};
pub use smooth::{ewma, smooth_panel, smooth_series, span_to_alpha, SmoothedPanel};
