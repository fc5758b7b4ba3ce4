//! Race telemetry data model
//!
//! Defines the per-car, per-lap `TelemetrySample` that every data source
//! converts to, the final `RaceResult` classification rows, and the
//! projected `CarState` / `RaceState` views handed to consumers.
//!
//! All types serialize as camelCase JSON so snapshots match the telemetry
//! table schema field for field.

use crate::units::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel used when a car has no row in the results table
pub const UNKNOWN_IDENTITY: &str = "N/A";

/// One car's telemetry at the end of one lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Car number, the stable key shared with the results table
    pub car_number: String,

    /// Three-letter timing-screen abbreviation
    #[serde(default)]
    pub driver_short_name: String,

    /// Lap number (1-based)
    pub lap: u32,

    // === Timing ===
    pub lap_time: Seconds,
    pub sector1: Seconds,
    pub sector2: Seconds,
    pub sector3: Seconds,

    // === Race context ===
    /// Rank within this lap (1 = leader)
    pub position: u32,

    /// Gap to the leader (0 for the leader)
    pub gap_to_leader: Seconds,

    /// Gap to the car one place ahead (0 for the leader)
    pub gap_to_ahead: Seconds,

    // === Vehicle / driver inputs ===
    pub speed: Kph,
    pub rpm: Rpm,
    pub gear: i8,
    pub throttle: Percent,
    pub brake: Percent,

    /// Laps driven on the current set of tires
    pub tire_age: u32,

    /// Fuel remaining
    pub fuel: Percent,

    /// Share of the lap completed
    pub lap_distance: Percent,
}

impl TelemetrySample {
    /// Sum of the three sector splits
    pub fn sector_sum(&self) -> Seconds {
        self.sector1 + self.sector2 + self.sector3
    }
}

/// One row of the final race classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub position: u32,
    pub number: String,
    pub status: String,
    pub laps: u32,
    pub total_time: String,
    pub gap_first: String,
    pub gap_previous: String,
    pub fastest_lap_num: u32,
    pub fastest_lap_time: String,
    pub fastest_lap_kph: f64,
    pub team: String,
    pub class: String,
    pub group: Option<String>,
    pub division: String,
    pub vehicle: String,
    pub tires: Option<String>,
    pub driver_first_name: String,
    pub driver_second_name: String,
    pub driver_country: String,
}

impl RaceResult {
    pub fn driver_full_name(&self) -> String {
        format!("{} {}", self.driver_first_name, self.driver_second_name)
    }

    /// Fastest lap in seconds, if the timing string parses
    pub fn fastest_lap_seconds(&self) -> Option<Seconds> {
        Seconds::parse_lap_time(&self.fastest_lap_time)
    }
}

/// Identity fields joined onto telemetry by car number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub team: String,
    pub driver_full_name: String,
}

impl Identity {
    /// Identity for a car missing from the results table
    pub fn unknown() -> Self {
        Self {
            team: UNKNOWN_IDENTITY.to_string(),
            driver_full_name: UNKNOWN_IDENTITY.to_string(),
        }
    }
}

impl From<&RaceResult> for Identity {
    fn from(result: &RaceResult) -> Self {
        Self {
            team: result.team.clone(),
            driver_full_name: result.driver_full_name(),
        }
    }
}

/// A car's complete state as of the end of one lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarState {
    #[serde(flatten)]
    pub sample: TelemetrySample,
    pub team: String,
    pub driver_full_name: String,
}

impl CarState {
    pub fn new(sample: TelemetrySample, identity: Identity) -> Self {
        Self {
            sample,
            team: identity.team,
            driver_full_name: identity.driver_full_name,
        }
    }

    pub fn car_number(&self) -> &str {
        &self.sample.car_number
    }

    pub fn is_leader(&self) -> bool {
        self.sample.position == 1
    }
}

/// The race as of the end of exactly one lap
///
/// Holds one entry per car that has a sample for `lap`. Cars without a
/// sample are absent rather than zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceState {
    pub lap: u32,
    pub cars: BTreeMap<String, CarState>,
}

impl RaceState {
    pub fn empty(lap: u32) -> Self {
        Self {
            lap,
            cars: BTreeMap::new(),
        }
    }

    pub fn get(&self, car_number: &str) -> Option<&CarState> {
        self.cars.get(car_number)
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CarState> {
        self.cars.values()
    }

    /// The car classified first on this lap
    pub fn leader(&self) -> Option<&CarState> {
        self.iter().find(|c| c.is_leader())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample;

    #[test]
    fn test_sample_serializes_camel_case() {
        let json = serde_json::to_value(sample("13", 2, 1)).unwrap();
        assert_eq!(json["carNumber"], "13");
        assert_eq!(json["lapTime"], 101.5);
        assert_eq!(json["gapToLeader"], 0.0);
        assert_eq!(json["tireAge"], 2);
        assert!(json.get("car_number").is_none());
    }

    #[test]
    fn test_sample_deserializes_without_short_name() {
        let json = r#"{
            "carNumber": "7", "lap": 1, "lapTime": 100.0,
            "sector1": 35.0, "sector2": 33.0, "sector3": 32.0,
            "position": 1, "gapToLeader": 0, "gapToAhead": 0,
            "speed": 250, "rpm": 8000, "gear": 6, "throttle": 90, "brake": 0,
            "tireAge": 1, "fuel": 95.7, "lapDistance": 100
        }"#;
        let s: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(s.car_number, "7");
        assert_eq!(s.driver_short_name, "");
        assert!((s.sector_sum().0 - s.lap_time.0).abs() < 1e-9);
    }

    #[test]
    fn test_car_state_flattens_sample() {
        let state = CarState::new(
            sample("55", 3, 2),
            Identity {
                team: "RVA Graphics".to_string(),
                driver_full_name: "Spike Kohlbecker".to_string(),
            },
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["carNumber"], "55");
        assert_eq!(json["lap"], 3);
        assert_eq!(json["team"], "RVA Graphics");
        assert_eq!(json["driverFullName"], "Spike Kohlbecker");
        assert!(!state.is_leader());
    }

    #[test]
    fn test_unknown_identity_sentinel() {
        let id = Identity::unknown();
        assert_eq!(id.team, "N/A");
        assert_eq!(id.driver_full_name, "N/A");
    }

    #[test]
    fn test_race_state_leader() {
        let mut state = RaceState::empty(4);
        for (car, pos) in [("2", 2), ("13", 1)] {
            state
                .cars
                .insert(car.to_string(), CarState::new(sample(car, 4, pos), Identity::unknown()));
        }
        assert_eq!(state.len(), 2);
        assert_eq!(state.leader().map(|c| c.car_number()), Some("13"));
        assert!(RaceState::empty(1).leader().is_none());
    }
}
