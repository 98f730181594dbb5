//! Trip data input and output.

pub mod trips;

pub use trips::{parse_timestamp, read_trips, read_trips_csv, write_trips, write_trips_csv};
