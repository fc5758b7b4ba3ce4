//! Demo race generator
//!
//! Produces a complete, internally consistent telemetry table for a short
//! GR Cup race so the dashboard runs without any data files. Output is
//! fully deterministic: all variation comes from a seeded hash, so the same
//! configuration always yields the same race.
//!
//! Standings for each lap are derived from cumulative race time.

use crate::error::LoadError;
use pit_core::ranking::standings_from_cumulative_time;
use pit_core::units::*;
use pit_core::{TelemetrySample, TelemetryStore};
use std::collections::HashMap;

const PIT_LOSS: f64 = 25.0;
const FUEL_PER_LAP: f64 = 4.3;
const TIRE_DEGRADATION_PER_LAP: f64 = 0.05;

// =============================================================================
// Deterministic noise
// =============================================================================

/// Simple deterministic noise in 0..1 from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

// =============================================================================
// Race definition
// =============================================================================

#[derive(Debug, Clone)]
pub struct DemoEntry {
    pub car_number: String,
    pub driver_short_name: String,
}

impl DemoEntry {
    fn new(car_number: &str, driver_short_name: &str) -> Self {
        Self {
            car_number: car_number.to_string(),
            driver_short_name: driver_short_name.to_string(),
        }
    }
}

/// Running state of one car while the race is generated
struct CarRun {
    base_pace: f64,
    total_time: f64,
    tire_age: u32,
    fuel: f64,
}

#[derive(Debug, Clone)]
pub struct DemoRace {
    entries: Vec<DemoEntry>,
    total_laps: u32,
    /// car number -> lap on which it pits
    pit_stops: HashMap<String, u32>,
    seed: f64,
}

impl DemoRace {
    /// Five-car, 23-lap race with two scheduled pit stops
    pub fn new() -> Self {
        let entries = vec![
            DemoEntry::new("13", "WRK"),
            DemoEntry::new("55", "KHL"),
            DemoEntry::new("7", "BEL"),
            DemoEntry::new("2", "ROB"),
            DemoEntry::new("88", "DRU"),
        ];
        let pit_stops = HashMap::from([("88".to_string(), 10), ("2".to_string(), 12)]);

        Self {
            entries,
            total_laps: 23,
            pit_stops,
            seed: 0.0,
        }
    }

    pub fn with_laps(mut self, total_laps: u32) -> Self {
        self.total_laps = total_laps.max(1);
        self
    }

    /// Different seeds produce different (but still repeatable) races
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = f64::from(seed) * 1.618;
        self
    }

    pub fn with_pit_stop(mut self, car_number: &str, lap: u32) -> Self {
        self.pit_stops.insert(car_number.to_string(), lap);
        self
    }

    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    pub fn entries(&self) -> &[DemoEntry] {
        &self.entries
    }

    fn seed_for(&self, car: usize, lap: u32, channel: u32) -> f64 {
        self.seed + f64::from(lap) * 97.13 + car as f64 * 13.37 + f64::from(channel) * 0.731
    }

    /// Generate the full table, ordered by lap then by position
    pub fn generate(&self) -> Vec<TelemetrySample> {
        let mut runs: Vec<CarRun> = (0..self.entries.len())
            .map(|car| CarRun {
                base_pace: 101.0 + noise(self.seed_for(car, 0, 0)) * 2.0,
                total_time: 0.0,
                tire_age: 0,
                fuel: 100.0,
            })
            .collect();

        let mut data = Vec::with_capacity(self.entries.len() * self.total_laps as usize);

        for lap in 1..=self.total_laps {
            let mut lap_samples = Vec::with_capacity(self.entries.len());

            for (car, (entry, run)) in self.entries.iter().zip(runs.iter_mut()).enumerate() {
                let seed = |channel| self.seed_for(car, lap, channel);

                let mut lap_time = run.base_pace
                    + jitter(seed(1), 0.75)
                    + f64::from(run.tire_age) * TIRE_DEGRADATION_PER_LAP;

                if self.pit_stops.get(&entry.car_number) == Some(&lap) {
                    lap_time += PIT_LOSS;
                    run.tire_age = 0;
                    run.fuel = 100.0;
                }

                run.total_time += lap_time;
                run.tire_age += 1;
                run.fuel = (run.fuel - FUEL_PER_LAP).max(0.0);

                let sector1 = lap_time * 0.35 + jitter(seed(2), 0.5);
                let sector2 = lap_time * 0.33 + jitter(seed(3), 0.5);
                let sector3 = lap_time - sector1 - sector2;

                let brake = if noise(seed(4)) > 0.8 {
                    noise(seed(5)) * 20.0
                } else {
                    0.0
                };

                lap_samples.push(TelemetrySample {
                    car_number: entry.car_number.clone(),
                    driver_short_name: entry.driver_short_name.clone(),
                    lap,
                    lap_time: Seconds(lap_time),
                    sector1: Seconds(sector1),
                    sector2: Seconds(sector2),
                    sector3: Seconds(sector3),
                    position: 0,
                    gap_to_leader: Seconds::ZERO,
                    gap_to_ahead: Seconds::ZERO,
                    speed: Kph(250.0 + jitter(seed(6), 20.0)),
                    rpm: Rpm(7500.0 + noise(seed(7)) * 1000.0),
                    gear: 6,
                    throttle: Percent::new(90.0 + noise(seed(8)) * 10.0),
                    brake: Percent::new(brake),
                    tire_age: run.tire_age,
                    fuel: Percent::new(run.fuel),
                    lap_distance: Percent::new(100.0),
                });
            }

            let totals: Vec<(String, Seconds)> = self
                .entries
                .iter()
                .zip(&runs)
                .map(|(e, r)| (e.car_number.clone(), Seconds(r.total_time)))
                .collect();

            for standing in standings_from_cumulative_time(&totals) {
                if let Some(mut sample) = lap_samples
                    .iter()
                    .position(|s| s.car_number == standing.car_number)
                    .map(|i| lap_samples.swap_remove(i))
                {
                    sample.position = standing.position;
                    sample.gap_to_leader = standing.gap_to_leader;
                    sample.gap_to_ahead = standing.gap_to_ahead;
                    data.push(sample);
                }
            }
        }

        data
    }

    pub fn into_store(&self) -> Result<TelemetryStore, LoadError> {
        Ok(TelemetryStore::new(self.generate())?)
    }
}

impl Default for DemoRace {
    fn default() -> Self {
        Self::new()
    }
}
