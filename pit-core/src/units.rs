//! Type-safe wrappers for race telemetry units
//!
//! Newtype wrappers around f64 so lap times, speeds and percentages
//! cannot be mixed up. All unit types serialize transparently as numbers,
//! rounded to 3 decimal places to keep JSON snapshots compact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Round f64 to 3 decimal places for compact JSON serialization
fn round3<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 1000.0).round() / 1000.0)
}

/// Seconds (lap times, sector times, gaps)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round3")] pub f64);

impl Seconds {
    pub const ZERO: Seconds = Seconds(0.0);

    /// Parse a timing-sheet string such as `1:40.747` or `58.912`.
    ///
    /// Returns `None` for placeholders like `-` or empty cells.
    pub fn parse_lap_time(s: &str) -> Option<Seconds> {
        let s = s.trim().trim_start_matches('+');
        if s.is_empty() || s == "-" {
            return None;
        }

        let mut total = 0.0;
        for part in s.split(':') {
            let value: f64 = part.parse().ok()?;
            total = total * 60.0 + value;
        }
        Some(Seconds(total))
    }

    /// Gap rendering used on timing screens: `+1.64`
    pub fn as_gap(&self) -> String {
        format!("+{:.2}", self.0)
    }

    /// Lap time rendering with millisecond precision: `101.234`
    pub fn as_lap_time(&self) -> String {
        format!("{:.3}", self.0)
    }
}

impl Add for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 + rhs.0)
    }
}

impl Sub for Seconds {
    type Output = Seconds;

    fn sub(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 - rhs.0)
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

/// Kilometres per hour
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Kph(#[serde(serialize_with = "round3")] pub f64);

/// Revolutions per minute
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round3")] pub f64);

/// Percentage on a 0-100 scale (throttle, brake, fuel, lap distance)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round3")] pub f64);

impl Percent {
    /// Create a percentage clamped to 0-100
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    /// As a 0.0-1.0 fraction
    pub fn as_fraction(&self) -> f64 {
        self.0 / 100.0
    }
}
