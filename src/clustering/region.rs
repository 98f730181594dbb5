//! Region discovery and lookup.

use super::minibatch::{find_nearest_centroid, minibatch_kmeans, MiniBatchKMeansConfig};
use crate::config::PipelineConfig;
use crate::core::{Coordinate, RegionId};
use crate::error::{DemandError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A spatial region: its id and cluster centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub centroid: Coordinate,
}

/// Partitions coordinate space into regions; fit once, assign many times.
///
/// Once fitted the centroids never change. Coordinates outside the area the
/// regions were fitted on are still assigned to their nearest centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAssigner {
    config: MiniBatchKMeansConfig,
    regions: Option<Vec<Region>>,
}

impl RegionAssigner {
    pub fn new(config: MiniBatchKMeansConfig) -> Self {
        Self {
            config,
            regions: None,
        }
    }

    /// Assigner configured from the pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut kmeans = MiniBatchKMeansConfig::default()
            .k(config.k_regions)
            .batch_size(config.clustering.batch_size)
            .max_iter(config.clustering.max_iter)
            .tolerance(config.clustering.tolerance);
        kmeans.seed = config.random_seed;
        Self::new(kmeans)
    }

    /// Already-fitted assigner over known centroids; ids follow slice order.
    pub fn from_centroids(centroids: Vec<Coordinate>) -> Result<Self> {
        if centroids.is_empty() {
            return Err(DemandError::EmptyData("no centroids given".to_string()));
        }
        if centroids.iter().any(|c| !c.is_finite()) {
            return Err(DemandError::InvalidInput(
                "centroids must be finite".to_string(),
            ));
        }
        let regions = centroids
            .into_iter()
            .enumerate()
            .map(|(id, centroid)| Region { id, centroid })
            .collect::<Vec<_>>();
        Ok(Self {
            config: MiniBatchKMeansConfig::default().k(regions.len()),
            regions: Some(regions),
        })
    }

    /// Fit regions to `coordinates`. Refitting replaces any earlier regions.
    pub fn fit(&mut self, coordinates: &[Coordinate]) -> Result<&[Region]> {
        if coordinates.is_empty() {
            return Err(DemandError::EmptyData(
                "cannot fit regions without coordinates".to_string(),
            ));
        }
        if let Some(bad) = coordinates.iter().position(|c| !c.is_finite()) {
            return Err(DemandError::InvalidInput(format!(
                "coordinate {bad} is not finite"
            )));
        }

        let result = minibatch_kmeans(coordinates, &self.config);
        log::info!(
            "fitted {} regions (requested {}) over {} coordinates in {} steps, inertia {:.6}",
            result.centroids.len(),
            self.config.k,
            coordinates.len(),
            result.n_iter,
            result.inertia
        );

        let regions = result
            .centroids
            .into_iter()
            .enumerate()
            .map(|(id, centroid)| Region { id, centroid })
            .collect();
        Ok(self.regions.insert(regions).as_slice())
    }

    pub fn is_fitted(&self) -> bool {
        self.regions.is_some()
    }

    pub fn regions(&self) -> Result<&[Region]> {
        self.regions
            .as_deref()
            .ok_or(DemandError::NotFitted("RegionAssigner"))
    }

    pub fn n_regions(&self) -> usize {
        self.regions.as_ref().map_or(0, Vec::len)
    }

    pub fn config(&self) -> &MiniBatchKMeansConfig {
        &self.config
    }

    /// Region whose centroid is nearest; ties go to the lowest id.
    pub fn assign(&self, coordinate: &Coordinate) -> Result<RegionId> {
        let regions = self.regions()?;
        if !coordinate.is_finite() {
            return Err(DemandError::InvalidInput(format!(
                "cannot assign non-finite coordinate ({}, {})",
                coordinate.latitude, coordinate.longitude
            )));
        }
        let mut min_dist = f64::INFINITY;
        let mut nearest = regions[0].id;
        for region in regions {
            let dist = coordinate.squared_distance(&region.centroid);
            if dist < min_dist {
                min_dist = dist;
                nearest = region.id;
            }
        }
        Ok(nearest)
    }

    /// Assign many coordinates in parallel, preserving input order.
    pub fn assign_many(&self, coordinates: &[Coordinate]) -> Result<Vec<RegionId>> {
        let regions = self.regions()?;
        if coordinates.iter().any(|c| !c.is_finite()) {
            return Err(DemandError::InvalidInput(
                "cannot assign non-finite coordinates".to_string(),
            ));
        }
        let centroids: Vec<Coordinate> = regions.iter().map(|r| r.centroid).collect();
        Ok(coordinates
            .par_iter()
            .map(|c| regions[find_nearest_centroid(c, &centroids).0].id)
            .collect())
    }
}
