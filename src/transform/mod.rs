//! Feature transforms fitted on the training partition.
//!
//! # Example
//!
//! ```
//! use rideshare_demand::transform::{OneHotEncoder, StandardScaler};
//!
//! let scaler = StandardScaler::fit(&[vec![1.0], vec![3.0]]).unwrap();
//! assert_eq!(scaler.transform_row(&[2.0]).unwrap(), vec![0.0]);
//!
//! let regions = OneHotEncoder::fit(&[0usize, 2]);
//! assert_eq!(regions.encode(&1), vec![0.0, 0.0, 1.0]);
//! ```

pub mod encode;
pub mod scale;

pub use encode::OneHotEncoder;
pub use scale::{ScaleParams, StandardScaler};
