//! Per-region demand series on a shared bucket grid.

use super::bucket::{BucketWidth, TimeBucket};
use crate::error::{DemandError, Result};

/// Identifier of a spatial region, `0..k`.
pub type RegionId = usize;

/// Pickup counts for one region over contiguous, uniformly spaced buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    region: RegionId,
    start: TimeBucket,
    width: BucketWidth,
    counts: Vec<u32>,
}

impl DemandSeries {
    pub fn new(region: RegionId, start: TimeBucket, width: BucketWidth, counts: Vec<u32>) -> Self {
        Self {
            region,
            start,
            width,
            counts,
        }
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn start(&self) -> TimeBucket {
        self.start
    }

    pub fn width(&self) -> BucketWidth {
        self.width
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Counts as floating point values, in bucket order.
    pub fn values(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| f64::from(c)).collect()
    }

    /// Start instant of the bucket at `index`.
    pub fn bucket(&self, index: usize) -> TimeBucket {
        self.width.nth(self.start, index)
    }

    /// Position of `bucket` within the series, if covered.
    pub fn index_of(&self, bucket: TimeBucket) -> Option<usize> {
        self.width
            .index_of(self.start, bucket)
            .filter(|&i| i < self.counts.len())
    }

    pub fn count_at(&self, bucket: TimeBucket) -> Option<u32> {
        self.index_of(bucket).map(|i| self.counts[i])
    }

    /// Iterate `(bucket, count)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (TimeBucket, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(move |(i, &c)| (self.bucket(i), c))
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// All region series over one global bucket range, stored by ascending region id.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandPanel {
    width: BucketWidth,
    start: TimeBucket,
    n_buckets: usize,
    series: Vec<DemandSeries>,
}

impl DemandPanel {
    /// Build a panel from series that share the same grid.
    ///
    /// Series are reordered by region id; duplicate regions or series that
    /// disagree on start, width or length are rejected.
    pub fn from_series(mut series: Vec<DemandSeries>) -> Result<Self> {
        let first = series
            .first()
            .ok_or_else(|| DemandError::EmptyData("demand panel has no series".to_string()))?;
        let (width, start, n_buckets) = (first.width, first.start, first.len());

        for s in &series {
            if s.width != width || s.start != start {
                return Err(DemandError::InvalidInput(format!(
                    "series for region {} is not on the panel grid",
                    s.region
                )));
            }
            if s.len() != n_buckets {
                return Err(DemandError::DimensionMismatch {
                    expected: n_buckets,
                    got: s.len(),
                });
            }
        }

        series.sort_by_key(|s| s.region);
        if series.windows(2).any(|w| w[0].region == w[1].region) {
            return Err(DemandError::InvalidInput(
                "demand panel contains duplicate regions".to_string(),
            ));
        }

        Ok(Self {
            width,
            start,
            n_buckets,
            series,
        })
    }

    pub fn width(&self) -> BucketWidth {
        self.width
    }

    pub fn start(&self) -> TimeBucket {
        self.start
    }

    /// Start of the last bucket in the panel.
    pub fn end(&self) -> TimeBucket {
        self.width.nth(self.start, self.n_buckets.saturating_sub(1))
    }

    pub fn n_buckets(&self) -> usize {
        self.n_buckets
    }

    pub fn n_regions(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self) -> &[DemandSeries] {
        &self.series
    }

    pub fn regions(&self) -> Vec<RegionId> {
        self.series.iter().map(|s| s.region).collect()
    }

    pub fn get(&self, region: RegionId) -> Option<&DemandSeries> {
        self.series
            .binary_search_by_key(&region, |s| s.region)
            .ok()
            .map(|i| &self.series[i])
    }

    pub fn total(&self) -> u64 {
        self.series.iter().map(DemandSeries::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn width() -> BucketWidth {
        BucketWidth::from_minutes(15).unwrap()
    }

    fn t0() -> TimeBucket {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    // ==================== DemandSeries ====================

    #[test]
    fn series_bucket_lookup() {
        let s = DemandSeries::new(2, t0(), width(), vec![2, 0, 5]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.bucket(2), Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap());
        assert_eq!(s.count_at(s.bucket(2)), Some(5));
        assert_eq!(s.count_at(s.bucket(3)), None);
        assert_eq!(s.values(), vec![2.0, 0.0, 5.0]);
        assert_eq!(s.total(), 7);
    }

    #[test]
    fn series_iter_is_ordered() {
        let s = DemandSeries::new(0, t0(), width(), vec![1, 2]);
        let pairs: Vec<_> = s.iter().collect();
        assert_eq!(pairs[0], (t0(), 1));
        assert!(pairs[0].0 < pairs[1].0);
    }

    // ==================== DemandPanel ====================

    #[test]
    fn panel_sorts_by_region() {
        let panel = DemandPanel::from_series(vec![
            DemandSeries::new(3, t0(), width(), vec![0, 1]),
            DemandSeries::new(1, t0(), width(), vec![2, 0]),
        ])
        .unwrap();

        assert_eq!(panel.regions(), vec![1, 3]);
        assert_eq!(panel.get(3).unwrap().counts(), &[0, 1]);
        assert!(panel.get(2).is_none());
        assert_eq!(panel.end(), Utc.with_ymd_and_hms(2024, 1, 1, 10, 15, 0).unwrap());
        assert_eq!(panel.total(), 3);
    }

    #[test]
    fn panel_rejects_ragged_series() {
        let result = DemandPanel::from_series(vec![
            DemandSeries::new(0, t0(), width(), vec![0, 1]),
            DemandSeries::new(1, t0(), width(), vec![2]),
        ]);
        assert!(matches!(result, Err(DemandError::DimensionMismatch { .. })));
    }

    #[test]
    fn panel_rejects_duplicates_and_empty() {
        let dup = DemandPanel::from_series(vec![
            DemandSeries::new(0, t0(), width(), vec![0]),
            DemandSeries::new(0, t0(), width(), vec![1]),
        ]);
        assert!(dup.is_err());
        assert!(matches!(
            DemandPanel::from_series(Vec::new()),
            Err(DemandError::EmptyData(_))
        ));
    }
}
