//! Telemetry error types

use thiserror::Error;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur while setting up telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Invalid log filter, port or similar setting
    #[error("Invalid telemetry configuration: {0}")]
    InvalidConfiguration(String),

    /// A global tracing subscriber is already installed
    #[error("Tracing error: {0}")]
    TracingError(String),

    /// The Prometheus recorder could not be installed
    #[cfg(feature = "prometheus")]
    #[error("Metrics error: {0}")]
    MetricsError(String),
}
