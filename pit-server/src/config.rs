//! Server configuration
//!
//! Resolved once at startup: built-in defaults, then an optional JSON file,
//! then environment variables.

use pit_adapters::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TICK_MS: u64 = 500;
const MIN_TICK_MS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Autoplay period
    pub tick_interval_ms: u64,
    /// `.json` or `.csv`; generated demo race when unset
    pub telemetry_path: Option<PathBuf>,
    /// Semicolon CSV; bundled Indianapolis results when unset
    pub results_path: Option<PathBuf>,
    /// Request a strategy call every N laps while playing (0 = off)
    pub strategy_every_laps: u32,
    pub gemini: GeminiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            tick_interval_ms: DEFAULT_TICK_MS,
            telemetry_path: None,
            results_path: None,
            strategy_every_laps: 3,
            gemini: GeminiConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the config file (if any) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |var: &str| std::env::var(var).ok();
        let mut config = match config_file_path(&lookup) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PIT_COMMANDER_*` and Gemini overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("PIT_COMMANDER_BIND") {
            self.bind_addr = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PIT_COMMANDER_BIND",
                value,
            })?;
        }
        if let Some(value) = get("PIT_COMMANDER_TICK_MS") {
            self.tick_interval_ms =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "PIT_COMMANDER_TICK_MS",
                    value,
                })?;
        }
        if let Some(value) = get("PIT_COMMANDER_STRATEGY_LAPS") {
            self.strategy_every_laps =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "PIT_COMMANDER_STRATEGY_LAPS",
                    value,
                })?;
        }
        if let Some(value) = get("PIT_COMMANDER_TELEMETRY") {
            self.telemetry_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("PIT_COMMANDER_RESULTS") {
            self.results_path = Some(PathBuf::from(value));
        }
        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("API_KEY")) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_MS))
    }
}

/// `PIT_COMMANDER_CONFIG`, else `<config dir>/pit-commander/config.json` if it exists
fn config_file_path<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("PIT_COMMANDER_CONFIG").filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("pit-commander").join("config.json"))
        .filter(|path| path.exists())
}
