//! Lap-indexed race replay state machine
//!
//! Owns the current lap and the playing/paused status, and keeps the
//! projected `RaceState` in lock-step with the lap: every lap transition
//! (tick, seek or reset) recomputes the state before returning.
//!
//! This type has no notion of time. Whoever drives it (the server's
//! playback task) calls [`RaceSimulation::tick`] on its own cadence.

use crate::model::RaceState;
use crate::projector::{clamp_lap, Projector};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// What a single autoplay tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing changed
    Idle,
    /// Moved to the contained lap
    Advanced(u32),
    /// Already on the last lap; playback stopped
    Finished,
}

pub struct RaceSimulation {
    projector: Projector,
    max_laps: u32,
    lap: u32,
    state: PlaybackState,
    race_state: Arc<RaceState>,
}

impl RaceSimulation {
    /// Start paused on lap 1
    pub fn new(projector: Projector) -> Self {
        let max_laps = projector.max_laps();
        let race_state = Arc::new(projector.project(1));
        Self {
            projector,
            max_laps,
            lap: 1,
            state: PlaybackState::Paused,
            race_state,
        }
    }

    pub fn lap(&self) -> u32 {
        self.lap
    }

    pub fn max_laps(&self) -> u32 {
        self.max_laps
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    /// Shared handle to the current snapshot; never mutated after creation
    pub fn race_state(&self) -> Arc<RaceState> {
        Arc::clone(&self.race_state)
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Returns true if playback actually started
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.state = PlaybackState::Playing;
        true
    }

    /// Returns true if playback was running
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = PlaybackState::Paused;
        true
    }

    pub fn reset(&mut self) {
        self.state = PlaybackState::Paused;
        self.set_lap(1);
    }

    /// Seek to `target` (clamped). Seeking always pauses playback.
    pub fn go_to_lap(&mut self, target: i64) -> u32 {
        self.state = PlaybackState::Paused;
        self.set_lap(clamp_lap(target, self.max_laps));
        self.lap
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }

        let next = self.lap + 1;
        if next > self.max_laps {
            self.lap = self.max_laps;
            self.state = PlaybackState::Paused;
            return TickOutcome::Finished;
        }

        self.set_lap(next);
        TickOutcome::Advanced(next)
    }

    /// Point-in-time copy of everything a consumer needs
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            lap: self.lap,
            max_laps: self.max_laps,
            playing: self.is_playing(),
            captured_at: Utc::now(),
            race: self.race_state(),
        }
    }

    fn set_lap(&mut self, lap: u32) {
        self.lap = lap;
        self.race_state = Arc::new(self.projector.project(i64::from(lap)));
    }
}

/// Immutable view of the simulation handed to readers and collaborators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub lap: u32,
    pub max_laps: u32,
    pub playing: bool,
    pub captured_at: DateTime<Utc>,
    pub race: Arc<RaceState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::two_car_stores;

    fn simulation() -> RaceSimulation {
        let (telemetry, results) = two_car_stores();
        RaceSimulation::new(Projector::new(Arc::new(telemetry), Arc::new(results)))
    }

    #[test]
    fn test_initial_state_is_paused_on_lap_one() {
        let sim = simulation();
        assert_eq!(sim.lap(), 1);
        assert_eq!(sim.max_laps(), 3);
        assert!(!sim.is_playing());
        assert_eq!(*sim.race_state(), sim.projector().project(1));
    }

    #[test]
    fn test_play_and_pause_are_idempotent() {
        let mut sim = simulation();
        assert!(sim.play());
        assert!(!sim.play());
        assert!(sim.is_playing());
        assert!(sim.pause());
        assert!(!sim.pause());
        assert!(!sim.is_playing());
    }

    #[test]
    fn test_tick_while_paused_does_nothing() {
        let mut sim = simulation();
        assert_eq!(sim.tick(), TickOutcome::Idle);
        assert_eq!(sim.lap(), 1);
    }

    #[test]
    fn test_seek_clamps_like_pre_clamped_seek() {
        let mut a = simulation();
        let mut b = simulation();
        for target in [-10_i64, 0, 1, 2, 3, 4, 1000] {
            a.go_to_lap(target);
            b.go_to_lap(i64::from(clamp_lap(target, 3)));
            assert_eq!(a.lap(), b.lap());
        }
    }

    #[test]
    fn test_terminal_autoplay_stops_on_last_lap() {
        let mut sim = simulation();
        sim.go_to_lap(i64::from(sim.max_laps()) - 1);
        sim.play();
        assert_eq!(sim.tick(), TickOutcome::Advanced(3));
        assert_eq!(sim.tick(), TickOutcome::Finished);
        assert_eq!(sim.lap(), 3);
        assert!(!sim.is_playing());
    }

    #[test]
    fn test_reset_after_arbitrary_operations() {
        let mut sim = simulation();
        sim.play();
        sim.tick();
        sim.go_to_lap(3);
        sim.play();
        sim.tick();
        sim.reset();
        assert_eq!(sim.lap(), 1);
        assert!(!sim.is_playing());
        assert_eq!(*sim.race_state(), sim.projector().project(1));
    }

    #[test]
    fn test_two_car_scenario() {
        let mut sim = simulation();
        sim.go_to_lap(2);
        let state = sim.race_state();
        let cars: Vec<&str> = state.cars.keys().map(String::as_str).collect();
        assert_eq!(cars, vec!["1", "2"]);
        assert!(state.iter().all(|c| c.sample.lap == 2));

        sim.play();
        assert_eq!(sim.tick(), TickOutcome::Advanced(3));
        assert_eq!(sim.lap(), 3);
        assert!(sim.is_playing());

        assert_eq!(sim.tick(), TickOutcome::Finished);
        assert_eq!(sim.lap(), 3);
        assert!(!sim.is_playing());
    }

    #[test]
    fn test_seek_while_playing_pauses() {
        let mut sim = simulation();
        sim.play();
        sim.go_to_lap(1);
        assert!(!sim.is_playing());
        assert_eq!(sim.tick(), TickOutcome::Idle);
        assert_eq!(sim.lap(), 1);
    }

    #[test]
    fn test_lap_and_race_state_never_disagree() {
        let mut sim = simulation();
        sim.play();
        for _ in 0..5 {
            sim.tick();
            assert_eq!(sim.race_state().lap, sim.lap());
        }
        sim.go_to_lap(2);
        assert_eq!(sim.race_state().lap, 2);
    }

    #[test]
    fn test_old_snapshots_are_not_affected_by_later_laps() {
        let mut sim = simulation();
        let before = sim.snapshot();
        sim.go_to_lap(3);
        assert_eq!(before.lap, 1);
        assert_eq!(before.race.lap, 1);
        assert!(before.race.iter().all(|c| c.sample.lap == 1));
    }
}
