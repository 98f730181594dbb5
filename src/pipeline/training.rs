//! End-to-end training run.

use crate::aggregation::aggregate_within;
use crate::clustering::RegionAssigner;
use crate::config::PipelineConfig;
use crate::core::{Coordinate, DemandPanel, TimeBucket, TripBatch};
use crate::error::{DemandError, Result};
use crate::features::{FeatureAssembler, FeatureRow};
use crate::io::read_trips_csv;
use crate::models::{DemandModel, DemandPredictor, FeatureSettings, FittedModel, SmoothedBaseline};
use crate::validation::{chronological_split, evaluate, EvaluationReport};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Counts describing what a run consumed and produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub trips_used: usize,
    pub trips_rejected: usize,
    pub n_regions: usize,
    pub n_buckets: usize,
    pub rows_assembled: usize,
    pub rows_dropped_insufficient_history: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub cutoff: TimeBucket,
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: FittedModel,
    /// Demand panel the model was trained on; usable as request history.
    pub panel: DemandPanel,
    pub model_report: EvaluationReport,
    pub baseline_report: EvaluationReport,
    pub summary: RunSummary,
}

impl TrainingOutcome {
    /// Whether the model beat the smoothed baseline on held-out MAE.
    pub fn beats_baseline(&self) -> bool {
        self.model_report.overall.mae < self.baseline_report.overall.mae
    }
}

/// Model fitted on the train partition and scored on the rest.
#[derive(Debug, Clone)]
struct SplitFit {
    model: DemandModel,
    model_report: EvaluationReport,
    baseline_report: EvaluationReport,
    n_train: usize,
    n_test: usize,
    cutoff: TimeBucket,
}

/// Runs every stage from screened trips to a fitted, evaluated artifact.
#[derive(Debug, Clone)]
pub struct DemandPipeline {
    config: PipelineConfig,
}

impl DemandPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read trips from a CSV file and train on them.
    pub fn run_csv(&self, path: impl AsRef<Path>) -> Result<TrainingOutcome> {
        let batch = read_trips_csv(path)?;
        self.run(batch)
    }

    /// Screen, cluster, aggregate, assemble, split, fit and evaluate.
    pub fn run(&self, batch: TripBatch) -> Result<TrainingOutcome> {
        let config = &self.config;

        let batch = batch.screen(&config.bounding_box);
        if batch.rejected_count() > 0 {
            log::warn!(
                "rejected {} of {} trip records",
                batch.rejected_count(),
                batch.len() + batch.rejected_count()
            );
        }
        if batch.is_empty() {
            return Err(DemandError::EmptyData(format!(
                "no valid trips remain after filtering ({} rejected)",
                batch.rejected_count()
            )));
        }

        let coordinates: Vec<Coordinate> = batch.trips.iter().map(|t| t.pickup).collect();
        let mut assigner = RegionAssigner::from_config(config);
        let n_regions = assigner.fit(&coordinates)?.len();

        let panel = aggregate_within(
            &batch.trips,
            &assigner,
            config.bucket_width()?,
            config.max_buckets,
        )?;

        let assembly = FeatureAssembler::from_config(config)?.assemble(&panel)?;
        if assembly.dropped_insufficient_history > 0 {
            log::warn!(
                "dropped {} rows with insufficient history",
                assembly.dropped_insufficient_history
            );
        }
        let rows_assembled = assembly.rows.len();

        let fit = self.fit_split(assembly.rows)?;
        let artifact = FittedModel::new(FeatureSettings::from_config(config)?, assigner, fit.model)?;

        let summary = RunSummary {
            trips_used: batch.len(),
            trips_rejected: batch.rejected_count(),
            n_regions,
            n_buckets: panel.n_buckets(),
            rows_assembled,
            rows_dropped_insufficient_history: assembly.dropped_insufficient_history,
            n_train: fit.n_train,
            n_test: fit.n_test,
            cutoff: fit.cutoff,
        };

        log::info!(
            "training complete: model MAE {:.4} vs baseline MAE {:.4} on {} test rows",
            fit.model_report.overall.mae,
            fit.baseline_report.overall.mae,
            summary.n_test
        );

        Ok(TrainingOutcome {
            artifact,
            panel,
            model_report: fit.model_report,
            baseline_report: fit.baseline_report,
            summary,
        })
    }

    /// Split rows chronologically, fit on the earlier part only, score on the later.
    fn fit_split(&self, rows: Vec<FeatureRow>) -> Result<SplitFit> {
        let split = chronological_split(rows, self.config.train_fraction)?;

        let mut model = DemandModel::new(self.config.ridge_alpha);
        model.fit(&split.train)?;

        let model_report = evaluate(&model, &split.test)?;
        let baseline_report = evaluate(&SmoothedBaseline::new(), &split.test)?;

        Ok(SplitFit {
            model,
            model_report,
            baseline_report,
            n_train: split.train.len(),
            n_test: split.test.len(),
            cutoff: split.cutoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BucketWidth, DemandSeries, TripRecord};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    /// Two pickup hot spots with a daily cycle over three days.
    fn synthetic_trips() -> Vec<TripRecord> {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let spots = [(40.72, -74.00), (40.80, -73.95)];
        let mut trips = Vec::new();
        for bucket in 0..(3 * 24 * 4) {
            let hour = (bucket / 4) % 24;
            for (s, &(lat, lon)) in spots.iter().enumerate() {
                let n = 1 + (hour + s as i64 * 3) % 5;
                for j in 0..n {
                    let ts = start + Duration::minutes(15 * bucket + j);
                    let jitter = j as f64 * 1e-4;
                    trips.push(TripRecord::new(ts, lat + jitter, lon - jitter));
                }
            }
        }
        trips
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
            .k_regions(2)
            .lag_window(2)
            .ewma_span(3.0)
            .seed(7)
    }

    #[test]
    fn run_produces_artifact_and_reports() {
        let pipeline = DemandPipeline::new(config()).unwrap();
        let outcome = pipeline.run(TripBatch::new(synthetic_trips())).unwrap();

        let summary = &outcome.summary;
        assert_eq!(summary.n_regions, 2);
        assert_eq!(summary.n_buckets, 3 * 24 * 4);
        assert_eq!(summary.trips_rejected, 0);
        // lag_window 2 drops two buckets per region, horizon 1 leaves the last unlabelled
        assert_eq!(summary.rows_dropped_insufficient_history, 4);
        assert_eq!(summary.rows_assembled, 2 * (3 * 24 * 4 - 3));
        assert_eq!(summary.n_train + summary.n_test, summary.rows_assembled);

        assert_eq!(outcome.model_report.overall.n, summary.n_test);
        assert_eq!(outcome.baseline_report.predictor, "SmoothedBaseline");
        assert_eq!(outcome.artifact.regions().unwrap().len(), 2);
        assert!(outcome.model_report.overall.mae.is_finite());
    }

    // ==================== train partition only ====================

    #[test]
    fn model_sees_only_training_rows() {
        let pipeline = DemandPipeline::new(config()).unwrap();
        let outcome = pipeline.run(TripBatch::new(synthetic_trips())).unwrap();
        let summary = &outcome.summary;
        let model = outcome.artifact.model();

        assert_eq!(model.n_train().unwrap(), summary.n_train);
        assert!(summary.n_train < summary.rows_assembled);

        let train: Vec<f64> = FeatureAssembler::from_config(pipeline.config())
            .unwrap()
            .assemble(&outcome.panel)
            .unwrap()
            .rows
            .iter()
            .filter(|row| row.bucket < summary.cutoff)
            .map(|row| row.smoothed)
            .collect();
        assert_eq!(train.len(), summary.n_train);

        let names = model.feature_names().unwrap();
        let smoothed = names.iter().position(|n| n == "smoothed").unwrap();
        let mean = train.iter().sum::<f64>() / train.len() as f64;
        assert_relative_eq!(
            model.scale_params().unwrap()[smoothed].center,
            mean,
            epsilon = 1e-9
        );
    }

    #[test]
    fn region_first_seen_after_cutoff_is_unknown() {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let width = BucketWidth::from_minutes(15).unwrap();
        let n = 40;
        let series = (0..3)
            .map(|r| {
                let counts = (0..n).map(|i| ((i * (r + 2)) % 7) as u32).collect();
                DemandSeries::new(r, start, width, counts)
            })
            .collect();
        let panel = DemandPanel::from_series(series).unwrap();

        // region 2 only shows up over the last quarter of the history
        let late = start + Duration::minutes(15 * 34);
        let rows: Vec<FeatureRow> = FeatureAssembler::new(2, 1, 3.0)
            .unwrap()
            .assemble(&panel)
            .unwrap()
            .rows
            .into_iter()
            .filter(|row| row.region != 2 || row.bucket >= late)
            .collect();

        let pipeline = DemandPipeline::new(config().train_fraction(0.75)).unwrap();
        let fit = pipeline.fit_split(rows.clone()).unwrap();
        assert!(fit.cutoff <= late);

        assert_eq!(fit.model.known_regions().unwrap(), &[0, 1]);
        let names = fit.model.feature_names().unwrap();
        let unknown = names.iter().position(|n| n == "region_unknown").unwrap();
        let region_0 = names.iter().position(|n| n == "region_0").unwrap();

        let late_rows: Vec<&FeatureRow> = rows.iter().filter(|row| row.region == 2).collect();
        assert!(!late_rows.is_empty());
        for row in late_rows {
            assert!(row.bucket >= fit.cutoff);
            let design = fit.model.design_row(row).unwrap();
            assert_eq!(design[unknown], 1.0);
            assert!(design[region_0..unknown].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn rejected_trips_are_counted() {
        let mut trips = synthetic_trips();
        trips.push(TripRecord::new(Utc.with_ymd_and_hms(2024, 4, 1, 1, 0, 0).unwrap(), 0.0, 0.0));
        let outcome = DemandPipeline::new(config())
            .unwrap()
            .run(TripBatch::new(trips))
            .unwrap();
        assert_eq!(outcome.summary.trips_rejected, 1);
    }

    #[test]
    fn stray_far_future_trip_is_rejected_before_allocation() {
        let mut trips = synthetic_trips();
        trips.push(TripRecord::new(
            Utc.with_ymd_and_hms(2099, 4, 1, 1, 0, 0).unwrap(),
            40.72,
            -74.00,
        ));
        let result = DemandPipeline::new(config()).unwrap().run(TripBatch::new(trips));
        assert!(matches!(result, Err(DemandError::InvalidInput(_))));

        // a tight limit also trips on ordinary data
        let result = DemandPipeline::new(config().max_buckets(100))
            .unwrap()
            .run(TripBatch::new(synthetic_trips()));
        assert!(matches!(result, Err(DemandError::InvalidInput(_))));
    }

    #[test]
    fn no_valid_trips_is_empty_data() {
        let trips = vec![TripRecord::new(
            Utc.with_ymd_and_hms(2024, 4, 1, 1, 0, 0).unwrap(),
            51.5,
            -0.12,
        )];
        let result = DemandPipeline::new(config()).unwrap().run(TripBatch::new(trips));
        assert!(matches!(result, Err(DemandError::EmptyData(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(DemandPipeline::new(config().train_fraction(1.0)).is_err());
        assert!(DemandPipeline::new(config().horizon(2)).is_err());
    }
}
