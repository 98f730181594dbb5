//! Fixed-width time buckets.
//!
//! A bucket is identified by its start instant,
//! `floor(timestamp / width) * width` on Unix-epoch seconds.

use crate::error::{DemandError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Start instant of a time bucket.
pub type TimeBucket = DateTime<Utc>;

/// Width of the aggregation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketWidth {
    seconds: i64,
}

impl BucketWidth {
    /// Create a bucket width from whole seconds.
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        if seconds <= 0 {
            return Err(DemandError::InvalidParameter(format!(
                "bucket width must be positive, got {seconds}s"
            )));
        }
        Ok(Self { seconds })
    }

    /// Create a bucket width from whole minutes.
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        Self::from_seconds(i64::from(minutes) * 60)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn minutes(&self) -> f64 {
        self.seconds as f64 / 60.0
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// Start of the bucket containing `timestamp`.
    pub fn bucket_start(&self, timestamp: DateTime<Utc>) -> Result<TimeBucket> {
        let start = timestamp.timestamp().div_euclid(self.seconds) * self.seconds;
        DateTime::from_timestamp(start, 0).ok_or_else(|| {
            DemandError::InvalidInput(format!("timestamp {timestamp} cannot be bucketed"))
        })
    }

    /// The `n`-th bucket after `start` (which must itself be a bucket start).
    pub fn nth(&self, start: TimeBucket, n: usize) -> TimeBucket {
        start + Duration::seconds(self.seconds * n as i64)
    }

    /// Number of whole buckets from `start` to `bucket`, or `None` if `bucket`
    /// precedes `start` or is not aligned to the grid anchored at `start`.
    pub fn index_of(&self, start: TimeBucket, bucket: TimeBucket) -> Option<usize> {
        let delta = (bucket - start).num_seconds();
        if delta < 0 || delta % self.seconds != 0 {
            return None;
        }
        Some((delta / self.seconds) as usize)
    }
}
