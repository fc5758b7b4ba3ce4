//! Race state projection
//!
//! Turns the flat telemetry table into the state of the race at the end of
//! a single lap. Projection is a pure function of the two stores and the
//! lap number.

use crate::model::{CarState, RaceState};
use crate::store::{ResultsStore, TelemetryStore};
use std::sync::Arc;

/// Clamp a lap request into `[1, max_laps]`
pub fn clamp_lap(lap: i64, max_laps: u32) -> u32 {
    lap.clamp(1, i64::from(max_laps.max(1))) as u32
}

/// Project the race as of the end of `lap`
///
/// `lap` is clamped to the store's range first. Only samples recorded for
/// that lap contribute; cars without one are left out.
pub fn project(telemetry: &TelemetryStore, results: &ResultsStore, lap: i64) -> RaceState {
    let lap = clamp_lap(lap, telemetry.max_laps());
    let mut state = RaceState::empty(lap);

    for sample in telemetry.lap(lap) {
        let identity = results.identity(&sample.car_number);
        state
            .cars
            .insert(sample.car_number.clone(), CarState::new(sample.clone(), identity));
    }

    state
}

/// Projector bound to a pair of shared stores
#[derive(Debug, Clone)]
pub struct Projector {
    telemetry: Arc<TelemetryStore>,
    results: Arc<ResultsStore>,
}

impl Projector {
    pub fn new(telemetry: Arc<TelemetryStore>, results: Arc<ResultsStore>) -> Self {
        Self { telemetry, results }
    }

    pub fn project(&self, lap: i64) -> RaceState {
        project(&self.telemetry, &self.results, lap)
    }

    pub fn max_laps(&self) -> u32 {
        self.telemetry.max_laps()
    }

    pub fn telemetry(&self) -> &Arc<TelemetryStore> {
        &self.telemetry
    }

    pub fn results(&self) -> &Arc<ResultsStore> {
        &self.results
    }
}
