//! Spatial region discovery.
//!
//! Provides mini-batch k-means over pickup coordinates and the
//! [`RegionAssigner`] that turns its centroids into region ids.
//!
//! # Example
//!
//! ```
//! use rideshare_demand::clustering::{MiniBatchKMeansConfig, RegionAssigner};
//! use rideshare_demand::core::Coordinate;
//!
//! let coords = vec![
//!     Coordinate::new(40.71, -74.00),
//!     Coordinate::new(40.72, -74.01),
//!     Coordinate::new(40.90, -73.80),
//! ];
//! let mut assigner = RegionAssigner::new(MiniBatchKMeansConfig::default().k(2).seed(42));
//! assigner.fit(&coords).unwrap();
//! assert_eq!(assigner.assign(&Coordinate::new(40.89, -73.81)).unwrap(), 1);
//! ```

pub mod minibatch;
pub mod region;

pub use minibatch::{elbow_inertias, minibatch_kmeans, MiniBatchKMeansConfig, MiniBatchKMeansResult};
pub use region::{Region, RegionAssigner};
