//! # Tokensmith CLI
//!
//! Command-line front end for a tokensmith engine configuration.
//!
//! ## Usage
//!
//! ```bash
//! # Issue an identity and a transaction token for the subject in alice.json
//! tokensmith --config engine.yaml issue --subject alice.json \
//!   -t urn:redhat:params:oauth:token-type:rh-identity \
//!   -t urn:ietf:params:oauth:token-type:txn_token \
//!   --method GET --path /api/orders -H "x-request-id: 42"
//!
//! # Publish the aggregated signing keys
//! tokensmith --config engine.yaml jwks
//!
//! # List configured token types, or only validate the file
//! tokensmith --config engine.yaml token-types
//! tokensmith --config engine.yaml validate
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

use anyhow::Context;
use clap::Parser;
use tokensmith_telemetry::TelemetryConfig;

pub use cli::{Cli, Commands, IssueArgs, OutputFormat};
pub use error::{CliError, CliResult};

/// Parse the command line, set up telemetry and run the command
///
/// # Errors
///
/// Returns the command's failure with context; hints are printed to stderr.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::builder()
        .service_name("tokensmith-cli")
        .log_level(&cli.log_level)
        .json_logs(cli.json_logs)
        .stderr_output(true);
    if let Some(port) = cli.metrics_port {
        telemetry = telemetry.prometheus_port(port);
    }
    let _telemetry = telemetry
        .build()
        .init()
        .map_err(CliError::from)
        .context("failed to initialize telemetry")?;

    match commands::execute(&cli).await {
        Ok(value) => Ok(output::display(cli.format, &value)?),
        Err(e) => {
            for hint in e.suggestions() {
                eprintln!("hint: {hint}");
            }
            Err(e.into())
        }
    }
}
