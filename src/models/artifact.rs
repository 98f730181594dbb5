//! The fitted-model artifact.
//!
//! Bundles everything inference needs into one versioned JSON document:
//! region centroids, the fitted transforms and coefficients, and the
//! pipeline settings the features were built with.

use super::demand::DemandModel;
use super::traits::DemandPredictor;
use crate::clustering::{Region, RegionAssigner};
use crate::config::PipelineConfig;
use crate::core::{BucketWidth, DemandPanel};
use crate::error::{DemandError, Result};
use crate::features::{FeatureAssembler, FeatureRow};
use crate::pipeline::{Prediction, PredictionRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Artifact layout version written by this crate.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Feature settings that must match between training and inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSettings {
    pub bucket_width: BucketWidth,
    pub lag_window: usize,
    pub horizon: usize,
    pub ewma_span: f64,
}

impl FeatureSettings {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            bucket_width: config.bucket_width()?,
            lag_window: config.lag_window,
            horizon: config.horizon,
            ewma_span: config.ewma_span,
        })
    }

    pub fn assembler(&self) -> Result<FeatureAssembler> {
        FeatureAssembler::new(self.lag_window, self.horizon, self.ewma_span)
    }
}

/// Immutable bundle of region centroids, transforms and coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    format_version: u32,
    created_at: DateTime<Utc>,
    settings: FeatureSettings,
    regions: RegionAssigner,
    model: DemandModel,
}

impl FittedModel {
    /// Bundle fitted components; both must already be fitted.
    pub fn new(settings: FeatureSettings, regions: RegionAssigner, model: DemandModel) -> Result<Self> {
        regions.regions()?;
        if !model.is_fitted() {
            return Err(DemandError::NotFitted("DemandModel"));
        }
        if model.lag_window()? != settings.lag_window {
            return Err(DemandError::InvalidParameter(format!(
                "model was trained with {} lags but settings say {}",
                model.lag_window()?,
                settings.lag_window
            )));
        }
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            settings,
            regions,
            model,
        })
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    pub fn region_assigner(&self) -> &RegionAssigner {
        &self.regions
    }

    pub fn regions(&self) -> Result<&[Region]> {
        self.regions.regions()
    }

    pub fn model(&self) -> &DemandModel {
        &self.model
    }

    /// Predict demand for assembled rows.
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        self.model.predict(rows)
    }

    /// Predict demand for a location and time given recent history.
    ///
    /// See [`crate::pipeline::predict_request`].
    pub fn predict_request(
        &self,
        request: &PredictionRequest,
        history: &DemandPanel,
    ) -> Result<Prediction> {
        crate::pipeline::predict_request(self, request, history)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read an artifact, rejecting layouts this crate does not understand.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let artifact: FittedModel = serde_json::from_reader(reader)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(DemandError::InvalidInput(format!(
                "unsupported artifact format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        artifact.regions.regions()?;
        if !artifact.model.is_fitted() {
            return Err(DemandError::NotFitted("DemandModel"));
        }
        Ok(artifact)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| DemandError::Io {
            path: path.display().to_string(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        self.to_writer(&mut writer)?;
        writer.flush().map_err(io_err)?;
        log::info!("saved model artifact to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DemandError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let artifact = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "loaded model artifact from {} (created {})",
            path.display(),
            artifact.created_at
        );
        Ok(artifact)
    }
}
