//! Request-time prediction against recent demand history.

use crate::aggregation::smooth_series;
use crate::core::{Coordinate, DemandPanel, RegionId, TimeBucket};
use crate::error::{DemandError, Result};
use crate::models::FittedModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where demand is requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Resolved to the nearest region centroid.
    Coordinate(Coordinate),
    Region(RegionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub location: Location,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRequest {
    pub fn at_coordinate(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            location: Location::Coordinate(Coordinate::new(latitude, longitude)),
            timestamp,
        }
    }

    pub fn for_region(region: RegionId, timestamp: DateTime<Utc>) -> Self {
        Self {
            location: Location::Region(region),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub region: RegionId,
    /// Bucket whose features were used.
    pub feature_bucket: TimeBucket,
    /// Bucket the demand estimate is for.
    pub target_bucket: TimeBucket,
    pub demand: f64,
}

/// Predict demand for one request using `history` as the recent panel.
///
/// With horizon 1 the estimate is for the bucket after the one containing
/// the timestamp, whose features must be observable in `history`. With
/// horizon 0 it is for the bucket containing the timestamp, which may be
/// the first bucket past the end of `history`.
pub fn predict_request(
    artifact: &FittedModel,
    request: &PredictionRequest,
    history: &DemandPanel,
) -> Result<Prediction> {
    let settings = artifact.settings();
    if history.width() != settings.bucket_width {
        return Err(DemandError::InvalidInput(format!(
            "history uses {}-minute buckets but the model expects {}",
            history.width().minutes(),
            settings.bucket_width.minutes()
        )));
    }

    let region = match request.location {
        Location::Coordinate(coordinate) => artifact.region_assigner().assign(&coordinate)?,
        Location::Region(region) => {
            let known = artifact.regions()?.len();
            if region >= known {
                return Err(DemandError::InvalidInput(format!(
                    "region {region} does not exist (model has {known} regions)"
                )));
            }
            region
        }
    };

    let width = settings.bucket_width;
    let bucket = width.bucket_start(request.timestamp)?;
    let assembler = settings.assembler()?;
    let insufficient = || DemandError::InsufficientHistory {
        region,
        bucket: bucket.to_rfc3339(),
        needed: assembler.min_history().max(1),
    };

    let series = history.get(region).ok_or_else(insufficient)?;
    let index = width
        .index_of(series.start(), bucket)
        .ok_or_else(insufficient)?;
    let smoothed = smooth_series(series, settings.ewma_span)?;
    let row = assembler
        .row_at(series, &smoothed, index)?
        .ok_or_else(insufficient)?;

    let demand = artifact.model().predict_row(&row)?;
    let target_bucket = width.nth(bucket, settings.horizon);

    log::debug!(
        "predicted {demand:.3} trips for region {region} at {}",
        target_bucket.to_rfc3339()
    );

    Ok(Prediction {
        region,
        feature_bucket: bucket,
        target_bucket,
        demand,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::RegionAssigner;
    use crate::core::{BucketWidth, DemandSeries};
    use crate::features::FeatureAssembler;
    use crate::models::{DemandModel, DemandPredictor, FeatureSettings};
    use chrono::{Duration, TimeZone};

    fn start() -> TimeBucket {
        Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap()
    }

    fn history() -> DemandPanel {
        let width = BucketWidth::from_minutes(15).unwrap();
        let a: Vec<u32> = (0..48).map(|i| (i % 7) as u32).collect();
        let b: Vec<u32> = (0..48).map(|i| (10 + i % 3) as u32).collect();
        DemandPanel::from_series(vec![
            DemandSeries::new(0, start(), width, a),
            DemandSeries::new(1, start(), width, b),
        ])
        .unwrap()
    }

    fn artifact(horizon: usize) -> FittedModel {
        let settings = FeatureSettings {
            bucket_width: BucketWidth::from_minutes(15).unwrap(),
            lag_window: 2,
            horizon,
            ewma_span: 3.0,
        };
        let rows = settings.assembler().unwrap().assemble(&history()).unwrap().rows;
        let mut model = DemandModel::new(1.0);
        model.fit(&rows).unwrap();
        let assigner = RegionAssigner::from_centroids(vec![
            Coordinate::new(40.70, -74.00),
            Coordinate::new(40.80, -73.90),
        ])
        .unwrap();
        FittedModel::new(settings, assigner, model).unwrap()
    }

    #[test]
    fn horizon_one_predicts_next_bucket() {
        let model = artifact(1);
        let ts = start() + Duration::minutes(15 * 10 + 4);
        let prediction =
            predict_request(&model, &PredictionRequest::for_region(1, ts), &history()).unwrap();

        assert_eq!(prediction.region, 1);
        assert_eq!(prediction.feature_bucket, start() + Duration::minutes(150));
        assert_eq!(prediction.target_bucket, start() + Duration::minutes(165));
        assert!(prediction.demand >= 0.0);

        // Same row as the assembler would build for that bucket
        let panel = history();
        let series = panel.get(1).unwrap();
        let smoothed = smooth_series(series, 3.0).unwrap();
        let row = FeatureAssembler::new(2, 1, 3.0)
            .unwrap()
            .row_at(series, &smoothed, 10)
            .unwrap()
            .unwrap();
        assert_eq!(prediction.demand, model.model().predict_row(&row).unwrap());
    }

    #[test]
    fn coordinate_resolves_to_nearest_region() {
        let model = artifact(1);
        let ts = start() + Duration::minutes(15 * 20);
        let request = PredictionRequest::at_coordinate(40.79, -73.91, ts);
        let prediction = predict_request(&model, &request, &history()).unwrap();
        assert_eq!(prediction.region, 1);
    }

    #[test]
    fn horizon_zero_can_predict_past_history() {
        let model = artifact(0);
        let ts = start() + Duration::minutes(15 * 48);
        let prediction =
            predict_request(&model, &PredictionRequest::for_region(0, ts), &history()).unwrap();
        assert_eq!(prediction.target_bucket, prediction.feature_bucket);
        assert!(prediction.demand >= 0.0);
    }

    #[test]
    fn insufficient_history_is_an_error() {
        let model = artifact(1);

        // Too early for two lags
        let early = PredictionRequest::for_region(0, start() + Duration::minutes(15));
        assert!(matches!(
            predict_request(&model, &early, &history()),
            Err(DemandError::InsufficientHistory { region: 0, needed: 2, .. })
        ));

        // Before the history starts
        let before = PredictionRequest::for_region(0, start() - Duration::hours(1));
        assert!(matches!(
            predict_request(&model, &before, &history()),
            Err(DemandError::InsufficientHistory { .. })
        ));

        // Horizon 1 needs the containing bucket observed
        let after = PredictionRequest::for_region(0, start() + Duration::minutes(15 * 48));
        assert!(matches!(
            predict_request(&model, &after, &history()),
            Err(DemandError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn rejects_unknown_region_and_mismatched_width() {
        let model = artifact(1);
        let ts = start() + Duration::minutes(15 * 20);
        assert!(matches!(
            predict_request(&model, &PredictionRequest::for_region(5, ts), &history()),
            Err(DemandError::InvalidInput(_))
        ));

        let coarse = DemandPanel::from_series(vec![DemandSeries::new(
            0,
            start(),
            BucketWidth::from_minutes(60).unwrap(),
            vec![1; 12],
        )])
        .unwrap();
        assert!(matches!(
            predict_request(&model, &PredictionRequest::for_region(0, ts), &coarse),
            Err(DemandError::InvalidInput(_))
        ));
    }
}
