//! Errors raised while loading race data

use pit_core::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("results table has no `{0}` column")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse `{value}` as {field}")]
    BadNumber {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("unsupported telemetry file extension: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
