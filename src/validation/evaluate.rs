//! Held-out evaluation of demand predictors.

use crate::core::RegionId;
use crate::error::{DemandError, Result};
use crate::features::FeatureRow;
use crate::models::DemandPredictor;
use crate::utils::{calculate_metrics, RegressionMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall and per-region accuracy of one predictor on a test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub predictor: String,
    pub overall: RegressionMetrics,
    pub per_region: BTreeMap<RegionId, RegressionMetrics>,
}

impl EvaluationReport {
    /// The `n` regions with the highest MAE, worst first.
    ///
    /// Ties keep ascending region order.
    pub fn worst_regions(&self, n: usize) -> Vec<(RegionId, RegressionMetrics)> {
        let mut ranked: Vec<(RegionId, RegressionMetrics)> =
            self.per_region.iter().map(|(&r, &m)| (r, m)).collect();
        ranked.sort_by(|a, b| b.1.mae.total_cmp(&a.1.mae).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Score `predictor` on labelled `test_rows`.
pub fn evaluate<P>(predictor: &P, test_rows: &[FeatureRow]) -> Result<EvaluationReport>
where
    P: DemandPredictor + ?Sized,
{
    if test_rows.is_empty() {
        return Err(DemandError::EmptyData("no test rows to evaluate".into()));
    }

    let actual = test_rows
        .iter()
        .map(FeatureRow::require_label)
        .collect::<Result<Vec<f64>>>()?;
    let predicted = predictor.predict(test_rows)?;
    let overall = calculate_metrics(&actual, &predicted)?;

    let mut grouped: BTreeMap<RegionId, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for ((row, &a), &p) in test_rows.iter().zip(actual.iter()).zip(predicted.iter()) {
        let entry = grouped.entry(row.region).or_default();
        entry.0.push(a);
        entry.1.push(p);
    }

    let per_region = grouped
        .into_iter()
        .map(|(region, (a, p))| calculate_metrics(&a, &p).map(|m| (region, m)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    log::info!(
        "{}: MAE {:.4}, RMSE {:.4}, R2 {:.4} over {} rows",
        predictor.name(),
        overall.mae,
        overall.rmse,
        overall.r_squared,
        overall.n
    );

    Ok(EvaluationReport {
        predictor: predictor.name().to_string(),
        overall,
        per_region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::TemporalFeatures;
    use crate::models::SmoothedBaseline;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn row(region: RegionId, smoothed: f64, label: f64) -> FeatureRow {
        let bucket = Utc.with_ymd_and_hms(2024, 5, 6, 17, 0, 0).unwrap();
        FeatureRow {
            region,
            bucket,
            temporal: TemporalFeatures::from_timestamp(bucket).unwrap(),
            smoothed,
            lags: vec![],
            label: Some(label),
        }
    }

    // ==================== evaluate ====================

    #[test]
    fn overall_and_per_region() {
        let rows = vec![
            row(0, 1.0, 1.0),
            row(0, 2.0, 3.0),
            row(1, 5.0, 1.0),
            row(1, 4.0, 2.0),
        ];
        let report = evaluate(&SmoothedBaseline::new(), &rows).unwrap();

        assert_eq!(report.predictor, "SmoothedBaseline");
        assert_eq!(report.overall.n, 4);
        // abs errors 0, 1, 4, 2
        assert_relative_eq!(report.overall.mae, 1.75, epsilon = 1e-12);
        assert_relative_eq!(report.overall.mse, 21.0 / 4.0, epsilon = 1e-12);

        assert_eq!(report.per_region.len(), 2);
        assert_relative_eq!(report.per_region[&0].mae, 0.5, epsilon = 1e-12);
        assert_relative_eq!(report.per_region[&1].mae, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn works_through_trait_object() {
        let predictor: Box<dyn DemandPredictor> = Box::new(SmoothedBaseline::new());
        let report = evaluate(&*predictor, &[row(0, 1.0, 1.0)]).unwrap();
        assert_relative_eq!(report.overall.mae, 0.0);
    }

    #[test]
    fn requires_rows_and_labels() {
        assert!(matches!(
            evaluate(&SmoothedBaseline::new(), &[]),
            Err(DemandError::EmptyData(_))
        ));

        let mut unlabeled = row(0, 1.0, 1.0);
        unlabeled.label = None;
        assert!(matches!(
            evaluate(&SmoothedBaseline::new(), &[unlabeled]),
            Err(DemandError::SchemaMismatch { .. })
        ));
    }

    // ==================== worst_regions ====================

    #[test]
    fn worst_regions_ranked_by_mae() {
        let rows = vec![
            row(0, 1.0, 2.0),
            row(1, 1.0, 5.0),
            row(2, 1.0, 1.0),
            row(3, 1.0, 5.0),
        ];
        let report = evaluate(&SmoothedBaseline::new(), &rows).unwrap();

        let worst: Vec<RegionId> = report.worst_regions(3).into_iter().map(|(r, _)| r).collect();
        assert_eq!(worst, vec![1, 3, 0]);
        assert_eq!(report.worst_regions(10).len(), 4);
        assert!(report.worst_regions(0).is_empty());
    }

    #[test]
    fn report_serializes() {
        let report = evaluate(&SmoothedBaseline::new(), &[row(7, 2.0, 3.0)]).unwrap();
        let json = report.to_json().unwrap();
        let back: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
