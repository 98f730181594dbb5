//! Demand regression model: standardize, one-hot encode, ridge.
//!
//! Every transform is fitted on the rows passed to [`DemandModel::fit`] and
//! nothing else. Numeric inputs are the cyclical calendar encodings, day of
//! month, weekend flag, smoothed demand and the lag window. Region and season
//! are one-hot encoded with an extra slot for categories absent from training.

use super::ridge::{ridge_fit, RidgeFit};
use super::traits::DemandPredictor;
use crate::core::RegionId;
use crate::error::{DemandError, Result};
use crate::features::{FeatureRow, Season, TemporalFeatures};
use crate::transform::{OneHotEncoder, ScaleParams, StandardScaler};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    lag_window: usize,
    scaler: StandardScaler,
    regions: OneHotEncoder<RegionId>,
    seasons: OneHotEncoder<Season>,
    ridge: RidgeFit,
    n_train: usize,
}

/// Ridge regression over engineered demand features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandModel {
    ridge_alpha: f64,
    fitted: Option<FittedState>,
}

impl Default for DemandModel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DemandModel {
    pub fn new(ridge_alpha: f64) -> Self {
        Self {
            ridge_alpha,
            fitted: None,
        }
    }

    pub fn ridge_alpha(&self) -> f64 {
        self.ridge_alpha
    }

    fn state(&self) -> Result<&FittedState> {
        self.fitted.as_ref().ok_or(DemandError::NotFitted("DemandModel"))
    }

    /// Lag window the model was trained with.
    pub fn lag_window(&self) -> Result<usize> {
        Ok(self.state()?.lag_window)
    }

    pub fn intercept(&self) -> Result<f64> {
        Ok(self.state()?.ridge.intercept)
    }

    /// Coefficients in the order of [`DemandModel::feature_names`].
    pub fn coefficients(&self) -> Result<&[f64]> {
        Ok(&self.state()?.ridge.coefficients)
    }

    pub fn n_train(&self) -> Result<usize> {
        Ok(self.state()?.n_train)
    }

    /// Region ids seen during training.
    pub fn known_regions(&self) -> Result<&[RegionId]> {
        Ok(self.state()?.regions.vocabulary())
    }

    /// Per-column standardization fitted on the training rows.
    pub fn scale_params(&self) -> Result<&[ScaleParams]> {
        Ok(self.state()?.scaler.params())
    }

    /// Names of the transformed design columns.
    pub fn feature_names(&self) -> Result<Vec<String>> {
        let state = self.state()?;
        let mut names: Vec<String> = TemporalFeatures::NUMERIC_NAMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        names.push("smoothed".to_string());
        names.extend((1..=state.lag_window).map(|k| format!("lag_{k}")));
        names.extend(state.regions.vocabulary().iter().map(|r| format!("region_{r}")));
        names.push("region_unknown".to_string());
        names.extend(state.seasons.vocabulary().iter().map(|s| format!("season_{s}")));
        names.push("season_unknown".to_string());
        Ok(names)
    }

    /// Transformed design columns of `row`, in [`DemandModel::feature_names`] order.
    pub fn design_row(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        let state = self.state()?;
        let numeric = numeric_features(row, state.lag_window)?;
        encode_row(state, &numeric, row)
    }

    /// Predict for one row, clipped at zero.
    pub fn predict_row(&self, row: &FeatureRow) -> Result<f64> {
        let design = self.design_row(row)?;
        Ok(self.state()?.ridge.predict_row(&design)?.max(0.0))
    }

    /// Serialize the fitted (or unfitted) model as JSON.
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Restore a model written by [`DemandModel::save`].
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl DemandPredictor for DemandModel {
    fn fit(&mut self, train: &[FeatureRow]) -> Result<()> {
        let first = train.first().ok_or_else(|| {
            DemandError::EmptyData("cannot fit demand model on zero rows".to_string())
        })?;
        let lag_window = first.lags.len();

        let mut numeric = Vec::with_capacity(train.len());
        let mut labels = Vec::with_capacity(train.len());
        for row in train {
            numeric.push(numeric_features(row, lag_window)?);
            labels.push(require_finite_label(row)?);
        }

        let scaler = StandardScaler::fit(&numeric)?;
        let regions = OneHotEncoder::fit(train.iter().map(|r| &r.region));
        let seasons = OneHotEncoder::fit(train.iter().map(|r| &r.temporal.season));

        let mut state = FittedState {
            lag_window,
            scaler,
            regions,
            seasons,
            ridge: RidgeFit {
                intercept: 0.0,
                coefficients: Vec::new(),
                alpha: self.ridge_alpha,
            },
            n_train: train.len(),
        };

        let design = numeric
            .iter()
            .zip(train.iter())
            .map(|(x, row)| encode_row(&state, x, row))
            .collect::<Result<Vec<_>>>()?;
        state.ridge = ridge_fit(&design, &labels, self.ridge_alpha)?;

        log::info!(
            "fitted demand model on {} rows: {} design columns, {} regions, alpha={}",
            train.len(),
            state.ridge.num_features(),
            state.regions.vocabulary().len(),
            self.ridge_alpha
        );

        self.fitted = Some(state);
        Ok(())
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        self.state()?;
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    fn name(&self) -> &str {
        "RidgeDemandModel"
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

/// Unscaled numeric inputs of a row, checked against the expected lag width.
fn numeric_features(row: &FeatureRow, lag_window: usize) -> Result<Vec<f64>> {
    if row.lags.len() != lag_window {
        return Err(DemandError::SchemaMismatch {
            row: row.identity(),
            detail: format!("expected {lag_window} lag features, got {}", row.lags.len()),
        });
    }

    let mut features = Vec::with_capacity(TemporalFeatures::NUMERIC_NAMES.len() + 1 + lag_window);
    features.extend_from_slice(&row.temporal.numeric());
    features.push(row.smoothed);
    features.extend_from_slice(&row.lags);

    if let Some(pos) = features.iter().position(|v| !v.is_finite()) {
        return Err(DemandError::SchemaMismatch {
            row: row.identity(),
            detail: format!("feature {pos} is not finite"),
        });
    }
    Ok(features)
}

fn require_finite_label(row: &FeatureRow) -> Result<f64> {
    let label = row.require_label()?;
    if !label.is_finite() {
        return Err(DemandError::SchemaMismatch {
            row: row.identity(),
            detail: "label is not finite".to_string(),
        });
    }
    Ok(label)
}

fn encode_row(state: &FittedState, numeric: &[f64], row: &FeatureRow) -> Result<Vec<f64>> {
    let mut design = state.scaler.transform_row(numeric)?;
    state.regions.encode_into(&row.region, &mut design);
    state.seasons.encode_into(&row.temporal.season, &mut design);
    Ok(design)
}
