//! Demand models.
//!
//! [`DemandModel`] is the ridge regression over scaled numeric features and
//! one-hot region and season indicators. [`SmoothedBaseline`] predicts the
//! smoothed demand directly. Both implement [`DemandPredictor`].
//! [`FittedModel`] bundles a fitted model with its region centroids for
//! persistence.

mod traits;

pub mod artifact;
pub mod baseline;
pub mod demand;
pub mod ridge;

pub use artifact::{FeatureSettings, FittedModel, ARTIFACT_FORMAT_VERSION};
pub use baseline::SmoothedBaseline;
pub use demand::DemandModel;
pub use ridge::{ridge_fit, RidgeFit};
pub use traits::DemandPredictor;
