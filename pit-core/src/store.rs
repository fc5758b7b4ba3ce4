//! Immutable telemetry and results stores
//!
//! Both stores are built once at startup and only ever read afterwards.
//! They are shared between the projector, the simulation and HTTP handlers
//! behind an `Arc`.

use crate::model::{Identity, RaceResult, TelemetrySample};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("telemetry store is empty")]
    Empty,

    #[error("sample {index} for car {car_number} has lap 0 (laps are 1-based)")]
    InvalidLap { index: usize, car_number: String },
}

/// Consistency problems found in a telemetry table
///
/// None of these are fatal; they are reported so the loader can log them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    DuplicateCar { lap: u32, car_number: String },
    DuplicatePosition { lap: u32, position: u32 },
    MissingPosition { lap: u32, position: u32 },
    NegativeGap { lap: u32, car_number: String },
}

/// Ordered per-car, per-lap telemetry samples
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    samples: Vec<TelemetrySample>,
    lap_index: BTreeMap<u32, Vec<usize>>,
    max_laps: u32,
}

impl TelemetryStore {
    pub fn new(samples: Vec<TelemetrySample>) -> Result<Self, StoreError> {
        if samples.is_empty() {
            return Err(StoreError::Empty);
        }

        let mut lap_index: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (index, sample) in samples.iter().enumerate() {
            if sample.lap == 0 {
                return Err(StoreError::InvalidLap {
                    index,
                    car_number: sample.car_number.clone(),
                });
            }
            lap_index.entry(sample.lap).or_default().push(index);
        }

        // Non-empty and every lap >= 1, so the index has a last key.
        let max_laps = lap_index.keys().next_back().copied().unwrap_or(1);

        Ok(Self {
            samples,
            lap_index,
            max_laps,
        })
    }

    /// Highest lap number present anywhere in the table
    pub fn max_laps(&self) -> u32 {
        self.max_laps
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// Samples recorded for `lap`, in table order
    pub fn lap(&self, lap: u32) -> impl Iterator<Item = &TelemetrySample> {
        self.lap_index
            .get(&lap)
            .into_iter()
            .flatten()
            .map(|&i| &self.samples[i])
    }

    /// All samples for one car, in table order
    pub fn car(&self, car_number: &str) -> Vec<&TelemetrySample> {
        self.samples
            .iter()
            .filter(|s| s.car_number == car_number)
            .collect()
    }

    /// Distinct car numbers in order of first appearance
    pub fn car_numbers(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.samples
            .iter()
            .filter(|s| seen.insert(s.car_number.as_str()))
            .map(|s| s.car_number.clone())
            .collect()
    }

    /// Check the per-lap invariants: unique cars, positions exactly `1..=N`,
    /// non-negative gaps
    pub fn validate(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for (&lap, indices) in &self.lap_index {
            let mut cars = BTreeSet::new();
            let mut positions = BTreeSet::new();

            for &i in indices {
                let s = &self.samples[i];
                if !cars.insert(s.car_number.as_str()) {
                    anomalies.push(Anomaly::DuplicateCar {
                        lap,
                        car_number: s.car_number.clone(),
                    });
                }
                if !positions.insert(s.position) {
                    anomalies.push(Anomaly::DuplicatePosition {
                        lap,
                        position: s.position,
                    });
                }
                if s.gap_to_leader.0 < 0.0 || s.gap_to_ahead.0 < 0.0 {
                    anomalies.push(Anomaly::NegativeGap {
                        lap,
                        car_number: s.car_number.clone(),
                    });
                }
            }

            for position in 1..=indices.len() as u32 {
                if !positions.contains(&position) {
                    anomalies.push(Anomaly::MissingPosition { lap, position });
                }
            }
        }

        anomalies
    }

    /// Run `validate` and log each anomaly
    pub fn log_anomalies(&self) -> usize {
        let anomalies = self.validate();
        for anomaly in &anomalies {
            warn!("Telemetry anomaly: {:?}", anomaly);
        }
        anomalies.len()
    }
}

/// Final race classification with a car-number index
#[derive(Debug, Clone, Default)]
pub struct ResultsStore {
    results: Vec<RaceResult>,
    index: HashMap<String, Identity>,
}

impl ResultsStore {
    pub fn new(results: Vec<RaceResult>) -> Self {
        let index = results
            .iter()
            .map(|r| (r.number.clone(), Identity::from(r)))
            .collect();
        Self { results, index }
    }

    /// Identity for a car, or the `N/A` sentinel when it has no row
    pub fn identity(&self, car_number: &str) -> Identity {
        self.index
            .get(car_number)
            .cloned()
            .unwrap_or_else(Identity::unknown)
    }

    pub fn get(&self, number: &str) -> Option<&RaceResult> {
        self.results.iter().find(|r| r.number == number)
    }

    pub fn results(&self) -> &[RaceResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
