//! Pit Commander Core Library
//!
//! Race telemetry data model, immutable stores, the lap projector, the
//! replay state machine, derived leaderboard/track/gauge views, and the
//! contract for the AI commentary collaborator.

pub mod commentary;
pub mod model;
pub mod projector;
pub mod ranking;
pub mod simulation;
pub mod store;
pub mod units;

#[cfg(test)]
pub(crate) mod test_support;

pub use model::{CarState, RaceResult, RaceState, TelemetrySample};
pub use projector::{project, Projector};
pub use simulation::{RaceSimulation, RaceSnapshot, TickOutcome};
pub use store::{ResultsStore, StoreError, TelemetryStore};
