//! Pit Commander Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod controller;
pub mod state;
pub mod strategy;
pub mod web_ui;
