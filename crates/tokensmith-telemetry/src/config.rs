//! Telemetry configuration

#[cfg(feature = "prometheus")]
use std::net::{IpAddr, Ipv4Addr};

/// Telemetry configuration
///
/// Use [`TelemetryConfigBuilder`] for ergonomic configuration construction.
///
/// # Example
///
/// ```rust
/// use tokensmith_telemetry::TelemetryConfig;
///
/// let config = TelemetryConfig::builder()
///     .service_name("token-exchange")
///     .log_level("info,tokensmith=debug")
///     .json_logs(false)
///     .build();
/// assert!(!config.json_logs);
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log filter directives, overridden by `RUST_LOG` when set
    pub log_level: String,
    /// Emit JSON lines instead of pretty output
    pub json_logs: bool,
    /// Write logs to stderr so stdout stays free for command output
    pub stderr_output: bool,

    /// Prometheus scrape endpoint port; no endpoint when unset
    #[cfg(feature = "prometheus")]
    pub prometheus_port: Option<u16>,
    /// Address the Prometheus endpoint binds to
    #[cfg(feature = "prometheus")]
    pub prometheus_bind: IpAddr,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tokensmith".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info,tokensmith=debug".to_string(),
            json_logs: true,
            stderr_output: true,

            #[cfg(feature = "prometheus")]
            prometheus_port: None,
            #[cfg(feature = "prometheus")]
            prometheus_bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Install the subscriber (and exporter) described by this configuration
    ///
    /// # Errors
    ///
    /// See [`TelemetryGuard::init`](crate::TelemetryGuard::init).
    pub fn init(self) -> Result<crate::TelemetryGuard, crate::TelemetryError> {
        crate::TelemetryGuard::init(self)
    }
}

/// Builder for [`TelemetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
    stderr_output: Option<bool>,

    #[cfg(feature = "prometheus")]
    prometheus_port: Option<u16>,
    #[cfg(feature = "prometheus")]
    prometheus_bind: Option<IpAddr>,
}

impl TelemetryConfigBuilder {
    /// Set the service name
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the service version
    #[must_use]
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Set the log filter, e.g. `"warn,tokensmith::issuance=info"`
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Enable or disable JSON log output
    #[must_use]
    pub fn json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = Some(enabled);
        self
    }

    /// Enable or disable stderr output
    #[must_use]
    pub fn stderr_output(mut self, enabled: bool) -> Self {
        self.stderr_output = Some(enabled);
        self
    }

    /// Serve Prometheus metrics on `port`
    #[cfg(feature = "prometheus")]
    #[cfg_attr(docsrs, doc(cfg(feature = "prometheus")))]
    #[must_use]
    pub fn prometheus_port(mut self, port: u16) -> Self {
        self.prometheus_port = Some(port);
        self
    }

    /// Bind the Prometheus endpoint to `addr`
    #[cfg(feature = "prometheus")]
    #[cfg_attr(docsrs, doc(cfg(feature = "prometheus")))]
    #[must_use]
    pub fn prometheus_bind(mut self, addr: IpAddr) -> Self {
        self.prometheus_bind = Some(addr);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();

        TelemetryConfig {
            service_name: self.service_name.unwrap_or(defaults.service_name),
            service_version: self.service_version.unwrap_or(defaults.service_version),
            log_level: self.log_level.unwrap_or(defaults.log_level),
            json_logs: self.json_logs.unwrap_or(defaults.json_logs),
            stderr_output: self.stderr_output.unwrap_or(defaults.stderr_output),

            #[cfg(feature = "prometheus")]
            prometheus_port: self.prometheus_port.or(defaults.prometheus_port),
            #[cfg(feature = "prometheus")]
            prometheus_bind: self.prometheus_bind.unwrap_or(defaults.prometheus_bind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "tokensmith");
        assert_eq!(config.log_level, "info,tokensmith=debug");
        assert!(config.json_logs);
        assert!(config.stderr_output);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::builder()
            .service_name("sts")
            .service_version("2.0.0")
            .log_level("debug")
            .json_logs(false)
            .stderr_output(false)
            .build();

        assert_eq!(config.service_name, "sts");
        assert_eq!(config.service_version, "2.0.0");
        assert_eq!(config.log_level, "debug");
        assert!(!config.json_logs);
        assert!(!config.stderr_output);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_prometheus_config() {
        let config = TelemetryConfig::builder()
            .prometheus_port(9464)
            .prometheus_bind(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .build();

        assert_eq!(config.prometheus_port, Some(9464));
        assert_eq!(config.prometheus_bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
