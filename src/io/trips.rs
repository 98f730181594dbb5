//! Trip CSV reader and writer.
//!
//! The header row is checked before any record is read. A data row that
//! cannot be parsed is rejected and counted; the rest of the file is still
//! read.

use crate::core::{TripBatch, TripRecord};
use crate::error::{DemandError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const TIMESTAMP_HEADERS: [&str; 2] = ["pickup_datetime", "pickup_timestamp"];
const PICKUP_LATITUDE: &str = "pickup_latitude";
const PICKUP_LONGITUDE: &str = "pickup_longitude";
const DROPOFF_LATITUDE: &str = "dropoff_latitude";
const DROPOFF_LONGITUDE: &str = "dropoff_longitude";

/// Naive timestamp layout accepted besides RFC 3339; read as UTC.
const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    latitude: usize,
    longitude: usize,
    dropoff: Option<(usize, usize)>,
}

impl Columns {
    fn resolve(headers: &[String], source: &str) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let missing = |name: &str| DemandError::SchemaMismatch {
            row: format!("{source} header"),
            detail: format!("missing required column '{name}'"),
        };

        let timestamp = TIMESTAMP_HEADERS
            .iter()
            .find_map(|&name| find(name))
            .ok_or_else(|| missing(&TIMESTAMP_HEADERS.join("' or '")))?;
        let latitude = find(PICKUP_LATITUDE).ok_or_else(|| missing(PICKUP_LATITUDE))?;
        let longitude = find(PICKUP_LONGITUDE).ok_or_else(|| missing(PICKUP_LONGITUDE))?;
        let dropoff = find(DROPOFF_LATITUDE).zip(find(DROPOFF_LONGITUDE));

        Ok(Self {
            timestamp,
            latitude,
            longitude,
            dropoff,
        })
    }

    fn parse(&self, record: &csv::StringRecord) -> Result<TripRecord> {
        let field = |i: usize, name: &str| {
            record
                .get(i)
                .map(str::trim)
                .ok_or_else(|| DemandError::InvalidInput(format!("missing field '{name}'")))
        };
        let number = |i: usize, name: &str| -> Result<f64> {
            let raw = field(i, name)?;
            raw.parse::<f64>()
                .map_err(|_| DemandError::InvalidInput(format!("invalid {name} '{raw}'")))
        };

        let pickup_time = parse_timestamp(field(self.timestamp, "pickup timestamp")?)?;
        let mut trip = TripRecord::new(
            pickup_time,
            number(self.latitude, PICKUP_LATITUDE)?,
            number(self.longitude, PICKUP_LONGITUDE)?,
        );

        // Drop-off is informational; an unreadable value leaves it unset
        if let Some((lat_i, lon_i)) = self.dropoff {
            let lat = number(lat_i, DROPOFF_LATITUDE);
            let lon = number(lon_i, DROPOFF_LONGITUDE);
            if let (Ok(lat), Ok(lon)) = (lat, lon) {
                trip = trip.with_dropoff(lat, lon);
            }
        }

        Ok(trip)
    }
}

/// Parse an RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| DemandError::InvalidInput(format!("unparseable timestamp '{raw}'")))
}

/// Read trips from CSV data.
///
/// `source` names the input in error messages.
pub fn read_trips<R: Read>(reader: R, source: &str) -> Result<TripBatch> {
    let csv_err = |e: csv::Error| DemandError::Csv {
        path: source.to_string(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let columns = Columns::resolve(&headers, source)?;

    let mut batch = TripBatch::default();
    for (index, result) in reader.records().enumerate() {
        let parsed = result
            .map_err(|e| DemandError::InvalidInput(e.to_string()))
            .and_then(|record| columns.parse(&record));
        match parsed {
            Ok(trip) => batch.push(trip, index),
            Err(e) => {
                log::trace!("skipping malformed row {index} in {source}: {e}");
                batch.reject(index, e.to_string());
            }
        }
    }

    if !batch.rejected.is_empty() {
        log::warn!(
            "rejected {} malformed rows in {source}",
            batch.rejected.len()
        );
    }
    log::info!("read {} trips from {source}", batch.trips.len());

    Ok(batch)
}

/// Read trips from a CSV file.
pub fn read_trips_csv(path: impl AsRef<Path>) -> Result<TripBatch> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DemandError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_trips(file, &path.display().to_string())
}

/// Write trips as CSV with `pickup_datetime` in RFC 3339.
pub fn write_trips<W: Write>(writer: W, trips: &[TripRecord], target: &str) -> Result<()> {
    let csv_err = |e: csv::Error| DemandError::Csv {
        path: target.to_string(),
        source: e,
    };

    let mut writer = csv::Writer::from_writer(writer);
    writer
        .write_record([
            TIMESTAMP_HEADERS[0],
            PICKUP_LATITUDE,
            PICKUP_LONGITUDE,
            DROPOFF_LATITUDE,
            DROPOFF_LONGITUDE,
        ])
        .map_err(csv_err)?;

    for trip in trips {
        let (drop_lat, drop_lon) = trip
            .dropoff
            .map(|c| (c.latitude.to_string(), c.longitude.to_string()))
            .unwrap_or_default();
        writer
            .write_record([
                trip.pickup_time.to_rfc3339(),
                trip.pickup.latitude.to_string(),
                trip.pickup.longitude.to_string(),
                drop_lat,
                drop_lon,
            ])
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|source| DemandError::Io {
        path: target.to_string(),
        source,
    })?;
    Ok(())
}

/// Write trips to a CSV file.
pub fn write_trips_csv(path: impl AsRef<Path>, trips: &[TripRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| DemandError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_trips(file, trips, &path.display().to_string())?;
    log::debug!("wrote {} trips to {}", trips.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BoundingBox;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
pickup_datetime,pickup_latitude,pickup_longitude,dropoff_latitude,dropoff_longitude
2024-03-04 10:02:00,40.71,-74.00,40.75,-73.99
2024-03-04T10:07:00Z,40.71,-74.00,,
not-a-date,40.71,-74.00,40.75,-73.99
2024-03-04 10:20:00,north,-73.80,40.75,-73.99
2024-03-04 10:20:00,40.90,-73.80,40.75,-73.99
";

    // ==================== read_trips ====================

    #[test]
    fn reads_valid_rows_and_rejects_malformed() {
        let batch = read_trips(SAMPLE.as_bytes(), "sample").unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.rejected_count(), 2);
        assert_eq!(batch.rejected[0].index, 2);
        assert_eq!(batch.rejected[1].index, 3);

        let first = batch.trips[0];
        assert_eq!(
            first.pickup_time,
            Utc.with_ymd_and_hms(2024, 3, 4, 10, 2, 0).unwrap()
        );
        assert!(first.dropoff.is_some());
        assert!(batch.trips[1].dropoff.is_none());
    }

    #[test]
    fn screening_keeps_csv_row_indices() {
        let data = "\
pickup_datetime,pickup_latitude,pickup_longitude
yesterday,40.71,-74.00
2024-03-04 10:05:00,51.50,-0.12
2024-03-04 10:10:00,40.71,-74.00
";
        let screened = read_trips(data.as_bytes(), "mixed")
            .unwrap()
            .screen(&BoundingBox::default());

        let indices: Vec<usize> = screened.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(screened.len(), 1);
        assert_eq!(screened.origin(0), 2);
    }

    #[test]
    fn accepts_timestamp_alias_and_column_order() {
        let data = "pickup_longitude,pickup_timestamp,pickup_latitude\n-74.0,2024-01-01T00:00:00+01:00,40.7\n";
        let batch = read_trips(data.as_bytes(), "alias").unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.trips[0].pickup_time,
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()
        );
        assert_eq!(batch.trips[0].pickup.longitude, -74.0);
    }

    #[test]
    fn missing_header_fails_fast() {
        let data = "pickup_datetime,pickup_latitude\n2024-03-04 10:02:00,40.71\n";
        match read_trips(data.as_bytes(), "short") {
            Err(DemandError::SchemaMismatch { detail, .. }) => {
                assert!(detail.contains("pickup_longitude"));
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }

        let data = "time,pickup_latitude,pickup_longitude\n";
        assert!(matches!(
            read_trips(data.as_bytes(), "no-time"),
            Err(DemandError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-01 12:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-01T12:30:00Z").unwrap(), expected);
        assert!(matches!(
            parse_timestamp("06/01/2024"),
            Err(DemandError::InvalidInput(_))
        ));
    }

    // ==================== files ====================

    #[test]
    fn file_round_trip() {
        let trips = vec![
            TripRecord::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 2, 0).unwrap(), 40.71, -74.0)
                .with_dropoff(40.75, -73.99),
            TripRecord::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 20, 0).unwrap(), 40.9, -73.8),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");

        write_trips_csv(&path, &trips).unwrap();
        let batch = read_trips_csv(&path).unwrap();

        assert_eq!(batch.trips, trips);
        assert_eq!(batch.rejected_count(), 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_trips_csv(dir.path().join("absent.csv")),
            Err(DemandError::Io { .. })
        ));
    }
}
