//! Trip records, coordinates and the service-area bounding box.

use crate::error::{DemandError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in (latitude, longitude) degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Squared Euclidean distance in coordinate space.
    pub fn squared_distance(&self, other: &Coordinate) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat * dlat + dlon * dlon
    }

    pub fn distance(&self, other: &Coordinate) -> f64 {
        self.squared_distance(other).sqrt()
    }
}

/// Rectangular service area; records outside it are rejected at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Default for BoundingBox {
    /// New York City, the usual home of pickup-level trip data.
    fn default() -> Self {
        Self {
            min_latitude: 40.49,
            max_latitude: 40.92,
            min_longitude: -74.27,
            max_longitude: -73.68,
        }
    }
}

impl BoundingBox {
    pub fn new(min_latitude: f64, max_latitude: f64, min_longitude: f64, max_longitude: f64) -> Self {
        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.is_finite()
            && coordinate.latitude >= self.min_latitude
            && coordinate.latitude <= self.max_latitude
            && coordinate.longitude >= self.min_longitude
            && coordinate.longitude <= self.max_longitude
    }

    pub fn validate(&self) -> Result<()> {
        let values = [
            self.min_latitude,
            self.max_latitude,
            self.min_longitude,
            self.max_longitude,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DemandError::InvalidParameter(
                "bounding box must have finite bounds".to_string(),
            ));
        }
        if self.min_latitude >= self.max_latitude || self.min_longitude >= self.max_longitude {
            return Err(DemandError::InvalidParameter(format!(
                "bounding box is empty: lat [{}, {}], lon [{}, {}]",
                self.min_latitude, self.max_latitude, self.min_longitude, self.max_longitude
            )));
        }
        Ok(())
    }
}

/// A single pickup event. Drop-off fields are carried but unused by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub pickup_time: DateTime<Utc>,
    pub pickup: Coordinate,
    pub dropoff: Option<Coordinate>,
}

impl TripRecord {
    pub fn new(pickup_time: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            pickup_time,
            pickup: Coordinate::new(latitude, longitude),
            dropoff: None,
        }
    }

    pub fn with_dropoff(mut self, latitude: f64, longitude: f64) -> Self {
        self.dropoff = Some(Coordinate::new(latitude, longitude));
        self
    }

    /// Check the pickup location against the service area.
    pub fn validate(&self, bounds: &BoundingBox) -> Result<()> {
        if !self.pickup.is_finite() {
            return Err(DemandError::InvalidInput(format!(
                "non-finite pickup coordinate ({}, {})",
                self.pickup.latitude, self.pickup.longitude
            )));
        }
        if !bounds.contains(&self.pickup) {
            return Err(DemandError::InvalidInput(format!(
                "pickup ({:.5}, {:.5}) outside bounding box",
                self.pickup.latitude, self.pickup.longitude
            )));
        }
        Ok(())
    }
}

/// A record that was rejected during ingest or screening.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    /// Zero-based position of the record in its source.
    pub index: usize,
    pub reason: String,
}

/// Trips accepted for processing plus an account of what was rejected.
///
/// Each trip remembers its position in the source it was read from, so
/// records rejected at any stage report the same index space.
#[derive(Debug, Clone, Default)]
pub struct TripBatch {
    pub trips: Vec<TripRecord>,
    pub rejected: Vec<RejectedRecord>,
    origins: Vec<usize>,
}

impl TripBatch {
    /// Wrap in-memory trips; each trip's source index is its position.
    pub fn new(trips: Vec<TripRecord>) -> Self {
        let origins = (0..trips.len()).collect();
        Self {
            trips,
            rejected: Vec::new(),
            origins,
        }
    }

    /// Append an accepted trip read from source position `origin`.
    pub fn push(&mut self, trip: TripRecord, origin: usize) {
        self.sync_origins();
        self.trips.push(trip);
        self.origins.push(origin);
    }

    /// Record a rejection at source position `index`.
    pub fn reject(&mut self, index: usize, reason: impl Into<String>) {
        self.rejected.push(RejectedRecord {
            index,
            reason: reason.into(),
        });
    }

    /// Source position of the trip at `position` in `trips`.
    pub fn origin(&self, position: usize) -> usize {
        self.origins.get(position).copied().unwrap_or(position)
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// Move every trip that fails `TripRecord::validate` into the rejected list.
    ///
    /// Newly rejected records carry the trip's source index, so they line up
    /// with rejections made while reading.
    pub fn screen(mut self, bounds: &BoundingBox) -> TripBatch {
        self.sync_origins();
        let mut screened = TripBatch {
            trips: Vec::with_capacity(self.trips.len()),
            rejected: self.rejected,
            origins: Vec::with_capacity(self.origins.len()),
        };
        for (trip, origin) in self.trips.into_iter().zip(self.origins) {
            match trip.validate(bounds) {
                Ok(()) => screened.push(trip, origin),
                Err(e) => {
                    log::trace!("rejecting trip {origin}: {e}");
                    screened.reject(origin, e.to_string());
                }
            }
        }
        screened
    }

    // `trips` is public, so callers may have pushed to it directly.
    fn sync_origins(&mut self) {
        let n = self.trips.len();
        self.origins.truncate(n);
        let start = self.origins.len();
        self.origins.extend(start..n);
    }
}
