//! Telemetry table loader
//!
//! Accepts either a JSON array of samples or a CSV file whose header row
//! uses the same camelCase field names. The table is validated once on load
//! and anomalies are logged, never rejected.

use crate::error::LoadError;
use pit_core::{TelemetrySample, TelemetryStore};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub fn parse_json<R: Read>(reader: R) -> Result<Vec<TelemetrySample>, LoadError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<TelemetrySample>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();
    for row in rdr.deserialize() {
        samples.push(row?);
    }
    Ok(samples)
}

/// Build a store from samples and report consistency problems
pub fn into_store(samples: Vec<TelemetrySample>) -> Result<TelemetryStore, LoadError> {
    let store = TelemetryStore::new(samples)?;
    let anomalies = store.log_anomalies();
    if anomalies > 0 {
        warn!("Telemetry table has {} consistency anomalies", anomalies);
    }
    Ok(store)
}

/// Load a `.json` or `.csv` telemetry table
pub fn load_telemetry(path: &Path) -> Result<TelemetryStore, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    let samples = match ext.as_str() {
        "json" => parse_json(reader)?,
        "csv" => parse_csv(reader)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    let store = into_store(samples)?;
    info!(
        "Loaded {} telemetry samples ({} laps) from {}",
        store.len(),
        store.max_laps(),
        path.display()
    );
    Ok(store)
}
