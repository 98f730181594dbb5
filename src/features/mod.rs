//! Feature engineering: calendar features and feature-row assembly.

pub mod assembly;
pub mod temporal;

pub use assembly::{Assembly, FeatureAssembler, FeatureRow};
pub use temporal::{Season, TemporalFeatures};
