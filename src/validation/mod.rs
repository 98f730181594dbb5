//! Chronological validation of demand predictors.
//!
//! Provides the time-ordered train/test split and held-out evaluation.
//!
//! # Example
//!
//! ```
//! use rideshare_demand::validation::{chronological_split, evaluate};
//! use rideshare_demand::features::{FeatureRow, TemporalFeatures};
//! use rideshare_demand::models::SmoothedBaseline;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 8, 7, 0, 0).unwrap();
//! let rows: Vec<FeatureRow> = (0..10)
//!     .map(|i| {
//!         let bucket = start + Duration::minutes(15 * i);
//!         FeatureRow {
//!             region: 0,
//!             bucket,
//!             temporal: TemporalFeatures::from_timestamp(bucket).unwrap(),
//!             smoothed: i as f64,
//!             lags: vec![],
//!             label: Some(i as f64 + 1.0),
//!         }
//!     })
//!     .collect();
//!
//! let split = chronological_split(rows, 0.8).unwrap();
//! assert_eq!(split.test.len(), 2);
//!
//! let report = evaluate(&SmoothedBaseline::new(), &split.test).unwrap();
//! assert!((report.overall.mae - 1.0).abs() < 1e-12);
//! ```

pub mod evaluate;
pub mod split;

pub use evaluate::{evaluate, EvaluationReport};
pub use split::{chronological_split, TrainTestSplit};
