//! Calendar and cyclical features of a timestamp.

use crate::error::{DemandError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Meteorological season (northern hemisphere) of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Season for a month in `1..=12`; months outside that range are rejected.
    pub fn from_month(month: u32) -> Result<Self> {
        match month {
            12 | 1 | 2 => Ok(Season::Winter),
            3..=5 => Ok(Season::Spring),
            6..=8 => Ok(Season::Summer),
            9..=11 => Ok(Season::Autumn),
            _ => Err(DemandError::InvalidInput(format!("month {month} out of range"))),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        };
        f.write_str(name)
    }
}

/// Calendar features of one instant (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// Day of month, 1-31
    pub day_of_month: u32,
    /// Month, 1-12
    pub month: u32,
    pub is_weekend: bool,
    pub season: Season,
}

impl TemporalFeatures {
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Result<Self> {
        let weekday = timestamp.weekday();
        let month = timestamp.month();
        Ok(Self {
            hour: timestamp.hour(),
            day_of_week: weekday.num_days_from_monday(),
            day_of_month: timestamp.day(),
            month,
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            season: Season::from_month(month)?,
        })
    }

    /// Features of a Unix-epoch instant; out-of-range instants are `InvalidInput`.
    pub fn from_unix_seconds(seconds: i64) -> Result<Self> {
        let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            DemandError::InvalidInput(format!("timestamp {seconds}s is out of range"))
        })?;
        Self::from_timestamp(timestamp)
    }

    /// Sine/cosine pairs for hour, weekday and month, plus day of month and
    /// the weekend flag, in the order of [`TemporalFeatures::NUMERIC_NAMES`].
    pub fn numeric(&self) -> [f64; 8] {
        let (hour_sin, hour_cos) = cyclical(f64::from(self.hour), 24.0);
        let (dow_sin, dow_cos) = cyclical(f64::from(self.day_of_week), 7.0);
        let (month_sin, month_cos) = cyclical(f64::from(self.month - 1), 12.0);
        [
            hour_sin,
            hour_cos,
            dow_sin,
            dow_cos,
            month_sin,
            month_cos,
            f64::from(self.day_of_month),
            if self.is_weekend { 1.0 } else { 0.0 },
        ]
    }

    pub const NUMERIC_NAMES: [&'static str; 8] = [
        "hour_sin",
        "hour_cos",
        "day_of_week_sin",
        "day_of_week_cos",
        "month_sin",
        "month_cos",
        "day_of_month",
        "is_weekend",
    ];
}

/// Map `value` on a cycle of length `period` to a point on the unit circle.
fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}
