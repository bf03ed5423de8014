//! Structured logging and Prometheus metrics for tokensmith
//!
//! - **Structured Logging**: JSON or pretty `tracing` output with `RUST_LOG`
//!   style filtering; the engine's `tokensmith::issuance` events land here
//! - **Metrics Collection**: [`metrics::MetricsObserver`] counts issuance
//!   outcomes per token type and exports them for Prometheus scraping
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokensmith::observer::{CompositeObserver, TracingObserver};
//! use tokensmith_telemetry::{TelemetryConfig, metrics::MetricsObserver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let _guard = TelemetryConfig::builder()
//!         .service_name("token-exchange")
//!         .prometheus_port(9464)
//!         .build()
//!         .init()?;
//!
//!     let observer = CompositeObserver::default()
//!         .with(Arc::new(TracingObserver::new()))
//!         .with(Arc::new(MetricsObserver::new()));
//!     // hand `observer` to the token service
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `prometheus` (default) - Prometheus exporter and [`metrics::MetricsObserver`]
//! - `full` - All features enabled

#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod init;

#[cfg(feature = "prometheus")]
#[cfg_attr(docsrs, doc(cfg(feature = "prometheus")))]
pub mod metrics;

// Re-exports
pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::{TelemetryError, TelemetryResult};
pub use init::TelemetryGuard;

/// Prelude for common imports
pub mod prelude {
    pub use super::{TelemetryConfig, TelemetryError, TelemetryGuard, TelemetryResult};

    #[cfg(feature = "prometheus")]
    pub use super::metrics::MetricsObserver;
}
