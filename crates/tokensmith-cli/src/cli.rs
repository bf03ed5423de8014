//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "tokensmith",
    version,
    about = "Issue tokens and publish keys from a tokensmith engine configuration",
    long_about = "Loads an engine configuration (TOML, YAML or JSON, with TOKENSMITH__* \
                  environment overrides) and issues tokens for a subject read from a JSON \
                  file. Issued tokens are bearer credentials; avoid piping them to shared logs."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Engine configuration file
    #[arg(long, short = 'c', global = true, env = "TOKENSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn,tokensmith=info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Serve Prometheus metrics on this port while the command runs
    #[arg(long, global = true)]
    pub metrics_port: Option<u16>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue one or more tokens for a subject
    Issue(IssueArgs),

    /// Print the aggregated public keys as a JWKS document
    Jwks,

    /// List the configured token types
    TokenTypes,

    /// Load and validate the configuration without issuing
    Validate,
}

/// Arguments of `issue`
#[derive(Args, Debug, Clone)]
pub struct IssueArgs {
    /// JSON file holding the subject's trust result
    #[arg(long, short = 's')]
    pub subject: PathBuf,

    /// JSON file holding the actor's trust result
    #[arg(long, short = 'a')]
    pub actor: Option<PathBuf>,

    /// Token type URN to issue; repeat for several
    #[arg(long = "token-type", short = 't', required = true)]
    pub token_types: Vec<String>,

    /// Requested scope
    #[arg(long, default_value = "")]
    pub scope: String,

    /// Request method recorded in the request attributes
    #[arg(long)]
    pub method: Option<String>,

    /// Request path recorded in the request attributes
    #[arg(long)]
    pub path: Option<String>,

    /// Request host recorded in the request attributes
    #[arg(long)]
    pub host: Option<String>,

    /// Caller address recorded in the request attributes
    #[arg(long)]
    pub source_address: Option<String>,

    /// Request header as `name:value`; repeat for several
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Abort issuance after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON
    Pretty,
    /// Single-line JSON
    Json,
}
