//! Named enrichment lookups used by claim mappers
//!
//! A [`DataSource`] fetches a JSON payload for a subject/actor/request
//! triple. Sources that also implement [`Cacheable`] are wrapped in a
//! [`CachingDataSource`] when they are registered, so mappers never need to
//! know whether a lookup is memoized.

mod cache;
mod http;
mod static_source;

pub use cache::{CacheOptions, CachingDataSource};
pub use http::{HttpDataSource, HttpDataSourceBuilder};
pub use static_source::StaticDataSource;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::context::RequestContext;
use crate::error::DataSourceError;
use crate::types::{RequestAttributes, TrustResult};

/// Input to a data source fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceInput {
    /// Subject identity
    pub subject: TrustResult,
    /// Actor identity
    #[serde(default)]
    pub actor: Option<TrustResult>,
    /// Request metadata
    #[serde(default, rename = "request")]
    pub request_attributes: RequestAttributes,
}

/// Payload returned by a data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSourceResult(pub Value);

impl DataSourceResult {
    /// Borrow the payload
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Take the payload
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for DataSourceResult {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A named enrichment lookup
#[async_trait]
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Registered name of the source
    fn name(&self) -> &str;

    /// Fetch the payload for `input`
    async fn fetch(
        &self,
        ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<DataSourceResult, DataSourceError>;

    /// Caching capability, if the source supports it
    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        None
    }
}

/// Optional capability of a data source whose results may be memoized
pub trait Cacheable: Send + Sync {
    /// Key identifying `input` for caching purposes
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::CacheKey`] when no key can be derived.
    fn cache_key(
        &self,
        ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<String, DataSourceError>;

    /// How long a cached result stays valid; zero means forever
    fn cache_ttl(&self) -> Duration;
}

/// Directory of data sources, keyed by name
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug)]
pub struct DataSourceRegistry {
    sources: HashMap<String, Arc<dyn DataSource>>,
    clock: Arc<dyn Clock>,
    cache_options: CacheOptions,
}

impl Default for DataSourceRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl DataSourceRegistry {
    /// Empty registry whose caches read time from `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_cache_options(clock, CacheOptions::default())
    }

    /// Empty registry with explicit cache options
    #[must_use]
    pub fn with_cache_options(clock: Arc<dyn Clock>, cache_options: CacheOptions) -> Self {
        Self {
            sources: HashMap::new(),
            clock,
            cache_options,
        }
    }

    /// Register a source under its own name, adding caching when supported
    ///
    /// Registering a second source with the same name replaces the first.
    pub fn register(&mut self, source: Arc<dyn DataSource>) {
        let name = source.name().to_string();
        let source = CachingDataSource::wrap(source, self.clock.clone(), self.cache_options);
        if self.sources.insert(name.clone(), source).is_some() {
            tracing::warn!(data_source = %name, "Replaced existing data source");
        }
    }

    /// Look up a source by name
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::NotFound`] for unknown names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn DataSource>, DataSourceError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(name.to_string()))
    }

    /// Whether a source is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fetch from the named source
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::NotFound`] for unknown names, or whatever
    /// the source returns.
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        name: &str,
        input: &DataSourceInput,
    ) -> Result<DataSourceResult, DataSourceError> {
        self.get(name)?.fetch(ctx, input).await
    }
}
