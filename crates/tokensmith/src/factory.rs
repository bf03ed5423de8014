//! Builds a [`TokenService`] from an [`EngineConfig`]

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::claims::Claims;
use crate::clock::Clock;
use crate::config::{
    DataSourceConfig, DataSourceKind, EngineConfig, IssuerConfig, IssuerKind, MapperConfig,
};
use crate::datasource::{DataSource, DataSourceRegistry, HttpDataSource, StaticDataSource};
use crate::error::ConfigError;
use crate::issuer::{Issuer, JwtIssuer, RhIdentityIssuer, StubIssuer, UnsignedIssuer};
use crate::mapper::{
    ClaimMapper, MapperPipeline, PassthroughMapper, RequestAttributesMapper, StubMapper,
    TemplateMapper,
};
use crate::observer::Observer;
use crate::registry::IssuerRegistry;
use crate::service::TokenService;

/// Validate `config` and assemble the service it describes
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when validation fails and
/// [`ConfigError::Build`] when a data source or mapper cannot be
/// constructed.
pub fn build_service(
    config: &EngineConfig,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn Observer>,
) -> Result<TokenService, ConfigError> {
    config.validate()?;

    let data_sources = Arc::new(build_data_sources(config, Arc::clone(&clock))?);
    let registry = Arc::new(IssuerRegistry::new());
    for issuer in &config.issuers {
        let built = build_issuer(issuer, Arc::clone(&clock))?;
        registry.register(issuer.token_type.clone(), built);
    }

    info!(
        trust_domain = %config.trust_domain,
        issuers = registry.len(),
        data_sources = config.datasources.len(),
        "Token service configured"
    );

    Ok(TokenService::new(
        config.trust_domain.clone(),
        registry,
        data_sources,
        observer,
    ))
}

/// Registry holding every configured data source
///
/// # Errors
///
/// Returns [`ConfigError::Build`] when a source cannot be constructed.
pub fn build_data_sources(
    config: &EngineConfig,
    clock: Arc<dyn Clock>,
) -> Result<DataSourceRegistry, ConfigError> {
    let mut registry = DataSourceRegistry::with_cache_options(clock, config.cache);
    for source in &config.datasources {
        registry.register(build_data_source(source)?);
    }
    Ok(registry)
}

fn build_data_source(config: &DataSourceConfig) -> Result<Arc<dyn DataSource>, ConfigError> {
    match &config.kind {
        DataSourceKind::Static { value } => {
            Ok(Arc::new(StaticDataSource::new(&config.name, value.clone())))
        }
        DataSourceKind::Http {
            url,
            headers,
            timeout_secs,
            cache_ttl_secs,
        } => {
            let mut builder = HttpDataSource::builder(&config.name, url);
            for (name, value) in headers {
                builder = builder.header(name, value);
            }
            if let Some(secs) = timeout_secs {
                builder = builder.timeout(Duration::from_secs(*secs));
            }
            if let Some(secs) = cache_ttl_secs {
                builder = builder.cache_ttl(Duration::from_secs(*secs));
            }
            let source = builder.build().map_err(|e| ConfigError::Build {
                component: format!("data source '{}'", config.name),
                message: e.to_string(),
            })?;
            Ok(Arc::new(source))
        }
    }
}

/// Issuer described by `config`
///
/// # Errors
///
/// Returns [`ConfigError::Build`] when one of its mappers cannot be
/// constructed.
pub fn build_issuer(
    config: &IssuerConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn Issuer>, ConfigError> {
    let token_type = config.token_type.clone();
    let issuer: Arc<dyn Issuer> = match &config.kind {
        IssuerKind::Stub {
            value,
            lifetime_secs,
        } => {
            let mut issuer = StubIssuer::new(token_type, value, clock);
            if let Some(secs) = lifetime_secs {
                issuer = issuer.with_lifetime(Duration::from_secs(*secs));
            }
            Arc::new(issuer)
        }
        IssuerKind::Unsigned {
            lifetime_secs,
            mappers,
        } => {
            let mut issuer = UnsignedIssuer::new(token_type, build_pipeline(mappers)?, clock);
            if let Some(secs) = lifetime_secs {
                issuer = issuer.with_lifetime(Duration::from_secs(*secs));
            }
            Arc::new(issuer)
        }
        IssuerKind::RhIdentity { mappers } => Arc::new(RhIdentityIssuer::with_token_type(
            token_type,
            build_pipeline(mappers)?,
            clock,
        )),
        IssuerKind::Jwt {} => Arc::new(JwtIssuer::new(token_type)),
    };
    Ok(issuer)
}

/// Mapper pipeline in configured order
///
/// # Errors
///
/// Returns [`ConfigError::Build`] when a template does not compile.
pub fn build_pipeline(mappers: &[MapperConfig]) -> Result<MapperPipeline, ConfigError> {
    mappers
        .iter()
        .map(build_mapper)
        .collect::<Result<Vec<_>, _>>()
        .map(MapperPipeline::new)
}

fn build_mapper(config: &MapperConfig) -> Result<Arc<dyn ClaimMapper>, ConfigError> {
    let mapper: Arc<dyn ClaimMapper> = match config {
        MapperConfig::Template {
            name,
            template,
            datasources,
        } => {
            let name = name.as_deref().unwrap_or("template");
            let mapper = TemplateMapper::new(name, template.clone(), datasources.iter().cloned())
                .map_err(|e| ConfigError::Build {
                    component: format!("mapper '{name}'"),
                    message: e.to_string(),
                })?;
            Arc::new(mapper)
        }
        MapperConfig::Passthrough => Arc::new(PassthroughMapper),
        MapperConfig::RequestAttributes { claim, headers } => {
            let mapper = claim
                .as_deref()
                .map_or_else(RequestAttributesMapper::default, RequestAttributesMapper::new);
            Arc::new(mapper.with_headers(headers.iter().cloned()))
        }
        MapperConfig::Stub { claims } => Arc::new(StubMapper::new(Claims::from(claims.clone()))),
    };
    Ok(mapper)
}
