//! Command implementations
//!
//! Each command returns the JSON document to print so callers decide how to
//! render it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokensmith::observer::{CompositeObserver, Observer, TracingObserver};
use tokensmith::{
    EngineConfig, IssueRequest, RequestAttributes, RequestContext, SystemClock, TokenService,
    TokenType, TrustResult, build_service,
};
use tokensmith_telemetry::metrics::MetricsObserver;
use tracing::{debug, warn};

use crate::cli::{Cli, Commands, IssueArgs};
use crate::error::{CliError, CliResult};

/// Run the selected command against the configured engine
///
/// # Errors
///
/// Returns [`CliError`] when the configuration, the inputs or the engine
/// call fail.
pub async fn execute(cli: &Cli) -> CliResult<Value> {
    let config = load_config(cli)?;
    match &cli.command {
        Commands::Validate => Ok(validate(&config)),
        Commands::TokenTypes => token_types(&config),
        Commands::Jwks => jwks(&config).await,
        Commands::Issue(args) => issue(&config, args).await,
    }
}

/// Load the configuration named on the command line
///
/// # Errors
///
/// Returns [`CliError::MissingConfig`] without `--config`, otherwise any
/// load or validation failure.
pub fn load_config(cli: &Cli) -> CliResult<EngineConfig> {
    let path = cli.config.as_deref().ok_or(CliError::MissingConfig)?;
    debug!(path = %path.display(), "Loading engine configuration");
    Ok(EngineConfig::load(path)?)
}

fn service(config: &EngineConfig) -> CliResult<TokenService> {
    let observer = CompositeObserver::new(vec![
        Arc::new(TracingObserver::new().with_trust_domain(&config.trust_domain))
            as Arc<dyn Observer>,
        Arc::new(MetricsObserver::new()),
    ]);
    Ok(build_service(config, Arc::new(SystemClock), Arc::new(observer))?)
}

fn validate(config: &EngineConfig) -> Value {
    json!({
        "valid": true,
        "trust_domain": config.trust_domain,
        "issuers": config.issuers.len(),
        "datasources": config.datasources.len(),
    })
}

fn token_types(config: &EngineConfig) -> CliResult<Value> {
    let service = service(config)?;
    Ok(json!({ "token_types": service.registry().list_token_types() }))
}

async fn jwks(config: &EngineConfig) -> CliResult<Value> {
    let service = service(config)?;
    Ok(serde_json::to_value(published_keys(&service).await)?)
}

/// Every key the issuers could produce
///
/// A failing issuer is logged and skipped so it does not hide the keys of
/// the others.
pub async fn published_keys(service: &TokenService) -> JwkSet {
    match service.jwks(&RequestContext::new()).await {
        Ok(keys) => keys,
        Err(err) => {
            for failure in &err.failures {
                warn!(
                    token_type = %failure.token_type,
                    error = %failure.error,
                    "Issuer public keys unavailable"
                );
            }
            JwkSet {
                keys: err.partial_keys,
            }
        }
    }
}

async fn issue(config: &EngineConfig, args: &IssueArgs) -> CliResult<Value> {
    let service = service(config)?;

    let subject: TrustResult = read_json(&args.subject)?;
    let mut request = IssueRequest::new(
        subject,
        args.token_types.iter().map(|urn| TokenType::new(urn.as_str())),
    )
    .with_scope(&args.scope)
    .with_request_attributes(request_attributes(args)?);
    if let Some(actor) = &args.actor {
        request = request.with_actor(read_json(actor)?);
    }

    let mut ctx = RequestContext::new();
    if let Some(secs) = args.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let tokens: BTreeMap<_, _> = service.issue_tokens(&ctx, request).await?.into_iter().collect();
    Ok(json!({ "tokens": tokens }))
}

/// Request attributes from the `issue` flags
///
/// # Errors
///
/// Returns [`CliError::InvalidArguments`] for a header without a `:`.
pub fn request_attributes(args: &IssueArgs) -> CliResult<RequestAttributes> {
    let mut headers = BTreeMap::new();
    for header in &args.headers {
        let (name, value) = header.split_once(':').ok_or_else(|| {
            CliError::InvalidArguments(format!("header '{header}' is not name:value"))
        })?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(RequestAttributes {
        method: args.method.clone(),
        path: args.path.clone(),
        host: args.host.clone(),
        source_address: args.source_address.clone(),
        headers,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}
