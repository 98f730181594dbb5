//! Core data structures: trips, time buckets and demand series.

mod bucket;
mod series;
mod trip;

pub use bucket::{BucketWidth, TimeBucket};
pub use series::{DemandPanel, DemandSeries, RegionId};
pub use trip::{BoundingBox, Coordinate, RejectedRecord, TripBatch, TripRecord};
