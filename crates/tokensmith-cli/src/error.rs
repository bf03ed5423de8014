//! CLI error types

use std::path::PathBuf;

use thiserror::Error;
use tokensmith::{ConfigError, TokenServiceError};
use tokensmith_telemetry::TelemetryError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    /// No configuration file was given
    #[error("No configuration file given; pass --config or set TOKENSMITH_CONFIG")]
    MissingConfig,

    /// The configuration failed to load or validate
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A subject or actor file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token issuance failed
    #[error("Issuance failed: {0}")]
    Issuance(#[from] TokenServiceError),

    /// Telemetry could not be initialized
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl CliError {
    /// User-facing hints for resolving the error
    #[must_use]
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::MissingConfig => vec!["Pass --config <file> or export TOKENSMITH_CONFIG"],
            Self::Config(ConfigError::UnsupportedFormat(_)) => {
                vec!["Use a .toml, .yaml, .yml or .json configuration file"]
            }
            Self::Config(_) => vec!["Run `tokensmith validate` to check the configuration"],
            Self::Issuance(TokenServiceError::IssuerNotFound { .. }) => {
                vec!["Run `tokensmith token-types` to list the configured token types"]
            }
            Self::InvalidArguments(_) => vec!["Headers are given as name:value"],
            _ => vec![],
        }
    }
}
