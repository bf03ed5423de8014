//! Telemetry initialization
//!
//! Provides the [`TelemetryGuard`] that owns the installed subscriber and,
//! with the `prometheus` feature, the metrics exporter.

use crate::{TelemetryConfig, TelemetryError};
use tracing::info;
use tracing_subscriber::{
    Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Guard that manages the telemetry lifecycle
///
/// Keep it alive for as long as the process issues tokens; the Prometheus
/// exporter handle lives inside it.
///
/// ```rust,ignore
/// let _telemetry = TelemetryConfig::default().init()?;
/// run().await?;
/// ```
pub struct TelemetryGuard {
    config: TelemetryConfig,
    #[cfg(feature = "prometheus")]
    metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("TelemetryGuard");
        debug.field("config", &self.config);
        #[cfg(feature = "prometheus")]
        debug.field(
            "metrics_handle",
            &self.metrics_handle.as_ref().map(|_| "PrometheusHandle"),
        );
        debug.finish()
    }
}

impl TelemetryGuard {
    /// Install the global subscriber described by `config`
    ///
    /// # Errors
    ///
    /// - [`TelemetryError::InvalidConfiguration`] for an unparsable log filter
    /// - [`TelemetryError::TracingError`] when a global subscriber already exists
    /// - [`TelemetryError::MetricsError`] when the Prometheus recorder cannot be installed
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        init_subscriber(&config)?;

        #[cfg(feature = "prometheus")]
        let metrics_handle = match config.prometheus_port {
            Some(port) => Some(init_prometheus(&config, port)?),
            None => None,
        };

        info!(
            service_name = %config.service_name,
            service_version = %config.service_version,
            json_logs = config.json_logs,
            stderr_output = config.stderr_output,
            "Tokensmith telemetry initialized"
        );

        Ok(Self {
            config,
            #[cfg(feature = "prometheus")]
            metrics_handle,
        })
    }

    /// Get the service name
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Current metrics in Prometheus text format, when an exporter is installed
    #[cfg(feature = "prometheus")]
    #[cfg_attr(docsrs, doc(cfg(feature = "prometheus")))]
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics_handle.as_ref().map(|handle| handle.render())
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        info!(
            service_name = %self.config.service_name,
            "Shutting down tokensmith telemetry"
        );
    }
}

/// Each output combination is its own path because the fmt layer types differ
/// Filter parsed from the configured level, used when `RUST_LOG` is unset
fn configured_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(log_level)
        .map_err(|e| TelemetryError::InvalidConfiguration(format!("Invalid log level: {e}")))
}

fn init_subscriber(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured_filter(&config.log_level)?,
    };

    if config.json_logs && config.stderr_output {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    } else if config.json_logs {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    } else if config.stderr_output {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .pretty();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .pretty();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracingError(e.to_string()))
    }
}

/// Install the Prometheus recorder and serve it from the current Tokio runtime
#[cfg(feature = "prometheus")]
fn init_prometheus(
    config: &TelemetryConfig,
    port: u16,
) -> Result<metrics_exporter_prometheus::PrometheusHandle, TelemetryError> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
        TelemetryError::MetricsError(format!("Prometheus endpoint needs a Tokio runtime: {e}"))
    })?;

    let addr = SocketAddr::new(config.prometheus_bind, port);
    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .build()
        .map_err(|e| TelemetryError::MetricsError(e.to_string()))?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsError(e.to_string()))?;
    crate::metrics::init_metrics();

    runtime.spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "Prometheus endpoint stopped");
        }
    });

    info!(%addr, "Prometheus metrics endpoint started");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_configuration_error() {
        let err = configured_filter("tokensmith=loudest").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(configured_filter(&TelemetryConfig::default().log_level).is_ok());
    }
}
