//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use serde_json::{Value, json};
use tokensmith::datasource::{Cacheable, DataSource, DataSourceInput, DataSourceResult};
use tokensmith::error::IssuerResult;
use tokensmith::issuer::{Issuer, StubIssuer};
use tokensmith::observer::RecordingObserver;
use tokensmith::{
    DataSourceError, IssueContext, IssuerError, ManualClock, RequestContext, Token, TokenService,
    TokenType, TrustResult,
};

/// Issuer that always fails with a key or encoding error
#[derive(Debug)]
pub struct FailingIssuer;

#[async_trait]
impl Issuer for FailingIssuer {
    async fn issue(&self, _ctx: &RequestContext, _issue_ctx: &IssueContext) -> IssuerResult<Token> {
        Err(IssuerError::Encoding("signer unavailable".into()))
    }

    async fn public_keys(&self, _ctx: &RequestContext) -> IssuerResult<Vec<Jwk>> {
        Err(IssuerError::Keys("signer unavailable".into()))
    }
}

/// Issuer that never finishes
#[derive(Debug)]
pub struct PendingIssuer;

#[async_trait]
impl Issuer for PendingIssuer {
    async fn issue(&self, _ctx: &RequestContext, _issue_ctx: &IssueContext) -> IssuerResult<Token> {
        std::future::pending().await
    }

    async fn public_keys(&self, _ctx: &RequestContext) -> IssuerResult<Vec<Jwk>> {
        Ok(Vec::new())
    }
}

/// Cacheable data source counting upstream fetches
#[derive(Debug)]
pub struct CountingSource {
    name: String,
    ttl: Duration,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(name: &str, ttl: Duration) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for CountingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        _ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<DataSourceResult, DataSourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(DataSourceResult(json!({
            "subject": input.subject.subject,
            "call": call
        })))
    }

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        Some(self)
    }
}

impl Cacheable for CountingSource {
    fn cache_key(
        &self,
        _ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<String, DataSourceError> {
        Ok(input.subject.subject.clone())
    }

    fn cache_ttl(&self) -> Duration {
        self.ttl
    }
}

pub fn alice() -> TrustResult {
    TrustResult::new("alice", "example.org").with_claim("email", "alice@example.org")
}

pub fn stub_issuer(
    token_type: &TokenType,
    value: &str,
    clock: &Arc<ManualClock>,
) -> Arc<dyn Issuer> {
    Arc::new(StubIssuer::new(token_type.clone(), value, clock.clone()))
}

/// Service for `example.org` reporting to a fresh recorder
pub fn recorded_service() -> (TokenService, Arc<RecordingObserver>, Arc<ManualClock>) {
    let observer = Arc::new(RecordingObserver::new());
    let service = TokenService::builder("example.org")
        .observer(observer.clone())
        .build();
    (service, observer, Arc::new(ManualClock::default()))
}

pub fn decode_rh_identity(value: &str) -> Value {
    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value)
        .expect("valid base64");
    serde_json::from_slice(&bytes).expect("valid JSON")
}
