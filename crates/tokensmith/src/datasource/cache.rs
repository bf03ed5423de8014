//! Transparent caching decorator for cacheable data sources

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DataSource, DataSourceInput, DataSourceResult};
use crate::clock::{Clock, saturating_add};
use crate::context::RequestContext;
use crate::error::DataSourceError;

/// Tuning for data source caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Upper bound on entries per source; unbounded when absent
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Memoized fetch result
#[derive(Debug, Clone)]
struct CacheEntry {
    result: DataSourceResult,
    /// `None` never expires
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Caching wrapper around a [`Cacheable`](super::Cacheable) data source
///
/// Expiry is checked lazily on read; nothing sweeps stale entries in the
/// background. No lock is held while the wrapped source is fetching, so two
/// concurrent misses for the same key may both reach the source, and the
/// later write wins. Failures are never cached.
///
/// With [`CacheOptions::max_entries`] set, admission of new keys is
/// serialized so the bound holds under concurrent misses.
#[derive(Debug)]
pub struct CachingDataSource {
    inner: Arc<dyn DataSource>,
    cache: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    options: CacheOptions,
    /// Held across the capacity check and insert of a bounded cache
    admission: Mutex<()>,
}

impl CachingDataSource {
    /// Wrap `source` if it is cacheable, otherwise hand it back unchanged
    pub fn wrap(
        source: Arc<dyn DataSource>,
        clock: Arc<dyn Clock>,
        options: CacheOptions,
    ) -> Arc<dyn DataSource> {
        if source.as_cacheable().is_none() {
            return source;
        }

        debug!(data_source = %source.name(), "Enabling result cache");
        Arc::new(Self::new(source, clock, options))
    }

    fn new(inner: Arc<dyn DataSource>, clock: Arc<dyn Clock>, options: CacheOptions) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            clock,
            options,
            admission: Mutex::new(()),
        }
    }

    /// Number of cached entries, fresh or stale
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn lookup(&self, key: &str, now: DateTime<Utc>) -> Option<DataSourceResult> {
        let entry = self.cache.get(key)?;
        entry.is_fresh(now).then(|| entry.result.clone())
    }

    fn store(&self, key: String, entry: CacheEntry, now: DateTime<Utc>) {
        let Some(max_entries) = self.options.max_entries else {
            self.cache.insert(key, entry);
            return;
        };

        // No shard guard may be held here: `len` and `retain` lock every shard.
        let _admission = self.admission.lock();
        if !self.cache.contains_key(&key) && self.cache.len() >= max_entries {
            self.cache.retain(|_, existing| existing.is_fresh(now));
            if self.cache.len() >= max_entries {
                debug!(
                    data_source = %self.inner.name(),
                    max_entries,
                    "Cache full, result not cached"
                );
                return;
            }
        }
        self.cache.insert(key, entry);
    }
}

#[async_trait]
impl DataSource for CachingDataSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<DataSourceResult, DataSourceError> {
        let Some(cacheable) = self.inner.as_cacheable() else {
            return ctx.run(self.inner.fetch(ctx, input)).await?;
        };

        let key = cacheable.cache_key(ctx, input)?;
        if let Some(result) = self.lookup(&key, self.clock.now()) {
            debug!(data_source = %self.name(), cache_key = %key, "Data source cache hit");
            return Ok(result);
        }

        debug!(data_source = %self.name(), cache_key = %key, "Data source cache miss");
        let result = ctx.run(self.inner.fetch(ctx, input)).await??;

        let now = self.clock.now();
        let ttl = cacheable.cache_ttl();
        let expires_at = (!ttl.is_zero()).then(|| saturating_add(now, ttl));
        self.store(
            key,
            CacheEntry {
                result: result.clone(),
                expires_at,
            },
            now,
        );

        Ok(result)
    }
}
