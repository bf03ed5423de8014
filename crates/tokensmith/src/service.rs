//! Token service
//!
//! [`TokenService::issue_tokens`] is the engine's entry point. Token types
//! are issued sequentially in request order and the first failure aborts the
//! whole call; callers either get every requested token or none.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tracing::{Instrument, debug};

use crate::context::RequestContext;
use crate::datasource::DataSourceRegistry;
use crate::error::{
    IssuerError, KeyRetrievalError, RegistryError, TokenServiceError, TokenServiceResult,
};
use crate::observer::{NoopObserver, Observer, Probe};
use crate::registry::IssuerRegistry;
use crate::token::{Token, TokenType};
use crate::types::{IssueContext, IssueRequest};

/// Issues tokens for one trust domain
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tokensmith::clock::SystemClock;
/// use tokensmith::issuer::StubIssuer;
/// use tokensmith::{IssueRequest, RequestContext, TokenService, TokenType, TrustResult};
///
/// # tokio_test::block_on(async {
/// let service = TokenService::builder("example.org").build();
/// service.registry().register(
///     TokenType::access_token(),
///     Arc::new(StubIssuer::new(TokenType::access_token(), "opaque", Arc::new(SystemClock))),
/// );
///
/// let request = IssueRequest::new(
///     TrustResult::new("alice", "example.org"),
///     [TokenType::access_token()],
/// );
/// let tokens = service.issue_tokens(&RequestContext::new(), request).await.unwrap();
/// assert_eq!(tokens.len(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenService {
    trust_domain: String,
    registry: Arc<IssuerRegistry>,
    data_sources: Arc<DataSourceRegistry>,
    observer: Arc<dyn Observer>,
}

/// Builder for [`TokenService`]
#[derive(Debug)]
pub struct TokenServiceBuilder {
    trust_domain: String,
    registry: Option<Arc<IssuerRegistry>>,
    data_sources: Option<Arc<DataSourceRegistry>>,
    observer: Option<Arc<dyn Observer>>,
}

impl TokenServiceBuilder {
    /// Use an existing issuer registry
    #[must_use]
    pub fn registry(mut self, registry: Arc<IssuerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use an existing data source registry
    #[must_use]
    pub fn data_sources(mut self, data_sources: Arc<DataSourceRegistry>) -> Self {
        self.data_sources = Some(data_sources);
        self
    }

    /// Report issuance to `observer`
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the service; unset parts default to empty registries and a
    /// no-op observer
    #[must_use]
    pub fn build(self) -> TokenService {
        TokenService {
            trust_domain: self.trust_domain,
            registry: self.registry.unwrap_or_default(),
            data_sources: self.data_sources.unwrap_or_default(),
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
        }
    }
}

impl TokenService {
    /// Service with every collaborator supplied
    pub fn new(
        trust_domain: impl Into<String>,
        registry: Arc<IssuerRegistry>,
        data_sources: Arc<DataSourceRegistry>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            trust_domain: trust_domain.into(),
            registry,
            data_sources,
            observer,
        }
    }

    /// Start building a service for `trust_domain`
    pub fn builder(trust_domain: impl Into<String>) -> TokenServiceBuilder {
        TokenServiceBuilder {
            trust_domain: trust_domain.into(),
            registry: None,
            data_sources: None,
            observer: None,
        }
    }

    /// Trust domain, used as the audience of every token
    #[must_use]
    pub fn trust_domain(&self) -> &str {
        &self.trust_domain
    }

    /// Issuer registry
    #[must_use]
    pub fn registry(&self) -> &Arc<IssuerRegistry> {
        &self.registry
    }

    /// Data source registry
    #[must_use]
    pub fn data_sources(&self) -> &Arc<DataSourceRegistry> {
        &self.data_sources
    }

    /// Issue every requested token type
    ///
    /// Types are issued one after another in request order; a type listed
    /// more than once is issued once. The observer is notified once per
    /// call and its probe receives a well-formed event sequence on every
    /// path, including cancellation and the returned future being dropped.
    ///
    /// # Errors
    ///
    /// - [`TokenServiceError::InvalidRequest`] when no token type is requested
    /// - [`TokenServiceError::IssuerNotFound`] for the first unregistered type
    /// - [`TokenServiceError::IssuanceFailed`] for the first failing issuer,
    ///   including cancellation and deadline expiry
    ///
    /// Tokens issued before a failure are discarded.
    pub async fn issue_tokens(
        &self,
        ctx: &RequestContext,
        request: IssueRequest,
    ) -> TokenServiceResult<HashMap<TokenType, Token>> {
        if request.token_types.is_empty() {
            return Err(TokenServiceError::InvalidRequest(
                "at least one token type must be requested".to_string(),
            ));
        }

        let (ctx, probe) = self.observer.token_issuance_started(
            ctx,
            &request.subject,
            request.actor.as_ref(),
            &request.scope,
            &request.token_types,
        );
        let mut probe = ProbeGuard::new(probe);

        let token_types = unique_in_order(&request.token_types);
        let issue_ctx =
            IssueContext::new(&request, &self.trust_domain, Arc::clone(&self.data_sources));
        let mut tokens = HashMap::with_capacity(token_types.len());

        for token_type in token_types {
            probe.started(token_type);

            let issuer = match self.registry.get_issuer(token_type) {
                Ok(issuer) => issuer,
                Err(source) => {
                    probe.issuer_not_found(token_type, &source);
                    probe.end();
                    return Err(TokenServiceError::IssuerNotFound {
                        token_type: token_type.clone(),
                        source,
                    });
                }
            };

            let issued = ctx
                .run(issuer.issue(&ctx, &issue_ctx))
                .instrument(ctx.span().clone())
                .await
                .unwrap_or_else(|interrupted| Err(interrupted.into()));

            match issued {
                Ok(token) => {
                    debug!(token_type = %token_type, "Token issued");
                    probe.succeeded(token_type, &token);
                    tokens.insert(token_type.clone(), token);
                }
                Err(source) => {
                    probe.failed(token_type, &source);
                    probe.end();
                    return Err(TokenServiceError::IssuanceFailed {
                        token_type: token_type.clone(),
                        source,
                    });
                }
            }
        }

        probe.end();
        Ok(tokens)
    }

    /// Public keys of every issuer, for key publication
    ///
    /// # Errors
    ///
    /// Returns [`KeyRetrievalError`] when any issuer fails; the keys of the
    /// others are carried inside the error.
    pub async fn public_keys(&self, ctx: &RequestContext) -> Result<Vec<Jwk>, KeyRetrievalError> {
        self.registry.get_all_public_keys(ctx).await
    }

    /// Public keys of every issuer as a JWKS document
    ///
    /// # Errors
    ///
    /// Same as [`public_keys`](Self::public_keys).
    pub async fn jwks(&self, ctx: &RequestContext) -> Result<JwkSet, KeyRetrievalError> {
        self.registry.jwks(ctx).await
    }
}

fn unique_in_order(token_types: &[TokenType]) -> Vec<&TokenType> {
    let mut seen = HashSet::with_capacity(token_types.len());
    token_types
        .iter()
        .filter(|token_type| seen.insert(*token_type))
        .collect()
}

/// Keeps the probe sequence well-formed if the issuing future is dropped
///
/// A type still in flight on drop is reported as cancelled, then `End`.
struct ProbeGuard {
    probe: Box<dyn Probe>,
    in_flight: Option<TokenType>,
    ended: bool,
}

impl ProbeGuard {
    fn new(probe: Box<dyn Probe>) -> Self {
        Self {
            probe,
            in_flight: None,
            ended: false,
        }
    }

    fn started(&mut self, token_type: &TokenType) {
        self.in_flight = Some(token_type.clone());
        self.probe.token_type_issuance_started(token_type);
    }

    fn succeeded(&mut self, token_type: &TokenType, token: &Token) {
        self.in_flight = None;
        self.probe.token_type_issuance_succeeded(token_type, token);
    }

    fn failed(&mut self, token_type: &TokenType, error: &IssuerError) {
        self.in_flight = None;
        self.probe.token_type_issuance_failed(token_type, error);
    }

    fn issuer_not_found(&mut self, token_type: &TokenType, error: &RegistryError) {
        self.in_flight = None;
        self.probe.issuer_not_found(token_type, error);
    }

    fn end(&mut self) {
        if !self.ended {
            self.ended = true;
            self.probe.end();
        }
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if let Some(token_type) = self.in_flight.take() {
            debug!(token_type = %token_type, "Issuance dropped while in flight");
            self.probe
                .token_type_issuance_failed(&token_type, &IssuerError::Cancelled);
        }
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::issuer::StubIssuer;
    use crate::observer::{ProbeEvent, RecordingObserver};
    use crate::types::TrustResult;

    fn service(observer: Arc<RecordingObserver>) -> TokenService {
        let service = TokenService::builder("example.org").observer(observer).build();
        service.registry().register(
            TokenType::access_token(),
            Arc::new(StubIssuer::new(
                TokenType::access_token(),
                "opaque",
                Arc::new(ManualClock::default()),
            )),
        );
        service
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected_before_observing() {
        let observer = Arc::new(RecordingObserver::new());
        let err = service(observer.clone())
            .issue_tokens(
                &RequestContext::new(),
                IssueRequest::new(TrustResult::new("alice", "example.org"), Vec::new()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TokenServiceError::InvalidRequest(_)));
        assert!(observer.probes().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_types_are_issued_once() {
        let observer = Arc::new(RecordingObserver::new());
        let request = IssueRequest::new(
            TrustResult::new("alice", "example.org"),
            [TokenType::access_token(), TokenType::access_token()],
        );

        let tokens = service(observer.clone())
            .issue_tokens(&RequestContext::new(), request)
            .await
            .unwrap();

        assert_eq!(tokens.len(), 1);
        let recorded = observer.last().unwrap();
        assert_eq!(recorded.token_types.len(), 2);
        assert_eq!(
            recorded.events,
            vec![
                ProbeEvent::TypeStarted(TokenType::access_token()),
                ProbeEvent::TypeSucceeded(TokenType::access_token()),
                ProbeEvent::End,
            ]
        );
    }

    #[test]
    fn test_dropped_guard_fails_in_flight_type_and_ends() {
        let observer = RecordingObserver::new();
        let (_ctx, probe) = observer.token_issuance_started(
            &RequestContext::new(),
            &TrustResult::new("alice", "example.org"),
            None,
            "",
            &[TokenType::access_token()],
        );

        let mut guard = ProbeGuard::new(probe);
        guard.started(&TokenType::access_token());
        drop(guard);

        let recorded = observer.last().unwrap();
        assert!(recorded.is_well_formed());
        assert_eq!(
            recorded.events,
            vec![
                ProbeEvent::TypeStarted(TokenType::access_token()),
                ProbeEvent::TypeFailed(TokenType::access_token()),
                ProbeEvent::End,
            ]
        );
    }
}
