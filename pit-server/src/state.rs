//! Application state management

use crate::config::ServerConfig;
use crate::controller::SimulationController;
use crate::strategy::StrategyPanel;
use anyhow::{Context, Result};
use pit_adapters::{provider_from_config, results, telemetry, DemoRace};
use pit_core::commentary::CommentaryProvider;
use pit_core::ranking::TrackOutline;
use pit_core::{Projector, ResultsStore, TelemetryStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: SimulationController,

    pub telemetry: Arc<TelemetryStore>,
    pub results: Arc<ResultsStore>,

    /// Commentary backend (Gemini, or a stand-in without an API key)
    pub commentary: Arc<dyn CommentaryProvider>,

    pub track: Arc<TrackOutline>,

    /// Car followed by the strategy watch; the leader when unset
    pub watched_car: Arc<RwLock<Option<String>>>,

    /// Latest strategy watch result
    pub strategy_panel: Arc<RwLock<StrategyPanel>>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        telemetry: TelemetryStore,
        results: ResultsStore,
        commentary: Arc<dyn CommentaryProvider>,
        config: ServerConfig,
    ) -> Self {
        let telemetry = Arc::new(telemetry);
        let results = Arc::new(results);
        let projector = Projector::new(Arc::clone(&telemetry), Arc::clone(&results));
        let controller = SimulationController::new(projector, config.tick_interval());

        Self {
            controller,
            telemetry,
            results,
            commentary,
            track: Arc::new(TrackOutline::indianapolis()),
            watched_car: Arc::new(RwLock::new(None)),
            strategy_panel: Arc::new(RwLock::new(StrategyPanel::Idle)),
            config: Arc::new(config),
        }
    }

    /// Load the stores and commentary backend named by `config`
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let telemetry = match &config.telemetry_path {
            Some(path) => telemetry::load_telemetry(path)
                .with_context(|| format!("loading telemetry from {}", path.display()))?,
            None => {
                let race = DemoRace::new();
                info!(
                    "No telemetry file configured, generating {}-lap demo race",
                    race.total_laps()
                );
                race.into_store().context("generating demo race")?
            }
        };

        let results = match &config.results_path {
            Some(path) => results::load_results(path)
                .with_context(|| format!("loading results from {}", path.display()))?,
            None => results::bundled_results().context("parsing bundled results")?,
        };

        let commentary = provider_from_config(&config.gemini);
        Ok(Self::new(telemetry, results, commentary, config))
    }

    /// Swap the commentary backend
    pub fn with_commentary(mut self, commentary: Arc<dyn CommentaryProvider>) -> Self {
        self.commentary = commentary;
        self
    }

    pub fn total_laps(&self) -> u32 {
        self.telemetry.max_laps()
    }
}
