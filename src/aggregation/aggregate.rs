//! Trip-to-demand aggregation.

use crate::clustering::RegionAssigner;
use crate::core::{BucketWidth, Coordinate, DemandPanel, DemandSeries, RegionId, TripRecord};
use crate::error::{DemandError, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Upper bound on the buckets one panel may span unless configured otherwise.
///
/// About 2.8 years of 15 minute buckets.
pub const DEFAULT_MAX_BUCKETS: usize = 100_000;

/// Count trips per (region, bucket).
///
/// Every region that received at least one trip gets a series spanning the
/// global first to last observed bucket, with zero counts where no trip fell.
/// The span is limited to [`DEFAULT_MAX_BUCKETS`]; see [`aggregate_within`].
pub fn aggregate(
    trips: &[TripRecord],
    assigner: &RegionAssigner,
    width: BucketWidth,
) -> Result<DemandPanel> {
    aggregate_within(trips, assigner, width, DEFAULT_MAX_BUCKETS)
}

/// Like [`aggregate`], failing with `InvalidInput` when the first and last
/// pickups are more than `max_buckets` buckets apart.
///
/// A single stray timestamp would otherwise zero-fill every region across
/// the whole gap.
pub fn aggregate_within(
    trips: &[TripRecord],
    assigner: &RegionAssigner,
    width: BucketWidth,
    max_buckets: usize,
) -> Result<DemandPanel> {
    if trips.is_empty() {
        return Err(DemandError::EmptyData(
            "no trips to aggregate".to_string(),
        ));
    }

    let buckets = trips
        .par_iter()
        .map(|t| width.bucket_start(t.pickup_time))
        .collect::<Result<Vec<_>>>()?;

    let (Some(&first), Some(&last)) = (buckets.iter().min(), buckets.iter().max()) else {
        return Err(DemandError::EmptyData("no buckets observed".to_string()));
    };
    let n_buckets = width.index_of(first, last).map_or(1, |i| i + 1);
    if n_buckets > max_buckets {
        return Err(DemandError::InvalidInput(format!(
            "pickup times span {n_buckets} buckets of {} min from {first} to {last}, \
             more than the limit of {max_buckets}",
            width.minutes()
        )));
    }

    let coordinates: Vec<Coordinate> = trips.iter().map(|t| t.pickup).collect();
    let regions = assigner.assign_many(&coordinates)?;

    let mut counts: BTreeMap<RegionId, Vec<u32>> = BTreeMap::new();
    for (&region, &bucket) in regions.iter().zip(buckets.iter()) {
        let index = width.index_of(first, bucket).ok_or_else(|| {
            DemandError::ComputationError(format!("bucket {bucket} is off the grid"))
        })?;
        counts.entry(region).or_insert_with(|| vec![0; n_buckets])[index] += 1;
    }

    let series = counts
        .into_iter()
        .map(|(region, c)| DemandSeries::new(region, first, width, c))
        .collect();
    let panel = DemandPanel::from_series(series)?;

    log::info!(
        "aggregated {} trips into {} regions x {} buckets of {} min ({} .. {})",
        trips.len(),
        panel.n_regions(),
        panel.n_buckets(),
        width.minutes(),
        panel.start(),
        panel.end()
    );

    Ok(panel)
}
