//! CLI error types.

use std::path::PathBuf;

use meridian_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the driver.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Missing snapshot path (see --help)")]
    MissingSnapshot,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
