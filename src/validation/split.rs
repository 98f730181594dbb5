//! Chronological train/test split.

use crate::core::TimeBucket;
use crate::error::{DemandError, Result};
use crate::features::FeatureRow;

/// Rows partitioned by time. Every train bucket is earlier than `cutoff`,
/// which is the first test bucket.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<FeatureRow>,
    pub test: Vec<FeatureRow>,
    pub cutoff: TimeBucket,
}

impl TrainTestSplit {
    /// Number of distinct buckets on each side.
    pub fn bucket_counts(&self) -> (usize, usize) {
        (distinct_buckets(&self.train), distinct_buckets(&self.test))
    }
}

/// Split rows so the earliest `train_fraction` of distinct buckets train
/// and the rest test.
///
/// Rows are stably sorted by (bucket, region) first. The number of train
/// buckets is `floor(train_fraction * distinct)` clamped to
/// `[1, distinct - 1]`, so neither side is ever empty.
pub fn chronological_split(rows: Vec<FeatureRow>, train_fraction: f64) -> Result<TrainTestSplit> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(DemandError::InvalidParameter(format!(
            "train_fraction must lie in (0, 1), got {train_fraction}"
        )));
    }

    let mut rows = rows;
    rows.sort_by(|a, b| a.bucket.cmp(&b.bucket).then(a.region.cmp(&b.region)));

    let distinct = distinct_buckets(&rows);
    if distinct < 2 {
        return Err(DemandError::InsufficientData {
            needed: 2,
            got: distinct,
        });
    }

    let n_train = ((train_fraction * distinct as f64).floor() as usize).clamp(1, distinct - 1);

    // Index of the first row in the (n_train)th distinct bucket
    let mut seen = 0;
    let mut boundary = rows.len();
    for (i, row) in rows.iter().enumerate() {
        if i == 0 || row.bucket != rows[i - 1].bucket {
            if seen == n_train {
                boundary = i;
                break;
            }
            seen += 1;
        }
    }

    let test = rows.split_off(boundary);
    let cutoff = test[0].bucket;

    log::info!(
        "split {} rows into {} train / {} test at {} ({n_train} of {distinct} buckets)",
        rows.len() + test.len(),
        rows.len(),
        test.len(),
        cutoff.to_rfc3339()
    );

    Ok(TrainTestSplit {
        train: rows,
        test,
        cutoff,
    })
}

/// Count distinct buckets in rows already sorted by bucket.
fn distinct_buckets(rows: &[FeatureRow]) -> usize {
    if rows.is_empty() {
        return 0;
    }
    1 + rows.windows(2).filter(|w| w[0].bucket != w[1].bucket).count()
}
