//! Data sources and collaborators for Pit Commander
//!
//! - `results`: final classification tables (semicolon CSV)
//! - `telemetry`: per-lap telemetry tables (JSON or CSV)
//! - `demo`: deterministic generated race for running without data files
//! - `analyst` / `gemini`: prompt building and the AI commentary backend

pub mod analyst;
pub mod demo;
pub mod error;
pub mod gemini;
pub mod results;
pub mod telemetry;

pub use analyst::respond;
pub use demo::DemoRace;
pub use error::LoadError;
pub use gemini::{provider_from_config, GeminiClient, GeminiConfig, UnconfiguredProvider};
