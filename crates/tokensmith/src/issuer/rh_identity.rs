//! Red Hat identity header issuer
//!
//! The token is the standard base64 encoding of `{"identity": <claims>}`.
//! It carries no signature and no expiry of its own.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::Jwk;
use serde_json::json;

use super::Issuer;
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::IssuerResult;
use crate::mapper::MapperPipeline;
use crate::token::{Token, TokenType};
use crate::types::IssueContext;

/// Issues `x-rh-identity` style tokens
#[derive(Debug, Clone)]
pub struct RhIdentityIssuer {
    token_type: TokenType,
    mappers: MapperPipeline,
    clock: Arc<dyn Clock>,
}

impl RhIdentityIssuer {
    /// Issuer registered under the standard rh-identity token type
    pub fn new(mappers: MapperPipeline, clock: Arc<dyn Clock>) -> Self {
        Self::with_token_type(TokenType::rh_identity(), mappers, clock)
    }

    /// Issuer registered under a custom token type
    pub fn with_token_type(
        token_type: TokenType,
        mappers: MapperPipeline,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_type,
            mappers,
            clock,
        }
    }
}

#[async_trait]
impl Issuer for RhIdentityIssuer {
    async fn issue(&self, ctx: &RequestContext, issue_ctx: &IssueContext) -> IssuerResult<Token> {
        let claims = self.mappers.run_for(ctx, issue_ctx).await?;
        let document = serde_json::to_vec(&json!({ "identity": claims }))?;

        Ok(Token::new(
            STANDARD.encode(document),
            self.token_type.clone(),
            self.clock.now(),
            DateTime::<Utc>::MAX_UTC,
        ))
    }

    async fn public_keys(&self, _ctx: &RequestContext) -> IssuerResult<Vec<Jwk>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Claims;
    use crate::clock::ManualClock;
    use crate::datasource::DataSourceRegistry;
    use crate::mapper::{PassthroughMapper, StubMapper};
    use crate::types::{IssueRequest, TrustResult};
    use pretty_assertions::assert_eq;

    fn issue_ctx(subject: TrustResult) -> IssueContext {
        let request = IssueRequest::new(subject, [TokenType::rh_identity()]);
        IssueContext::new(&request, "example.org", Arc::new(DataSourceRegistry::default()))
    }

    #[tokio::test]
    async fn test_identity_document_is_base64_json() {
        let clock = Arc::new(ManualClock::default());
        let mappers = MapperPipeline::default().with(Arc::new(StubMapper::new(
            Claims::try_from(json!({"sub": "alice"})).unwrap(),
        )));
        let issuer = RhIdentityIssuer::new(mappers, clock.clone());

        let token = issuer
            .issue(
                &RequestContext::new(),
                &issue_ctx(TrustResult::new("alice", "example.org")),
            )
            .await
            .unwrap();

        assert_eq!(token.value, STANDARD.encode(r#"{"identity":{"sub":"alice"}}"#));
        assert_eq!(token.token_type, TokenType::rh_identity());
        assert_eq!(token.issued_at, clock.now());
        assert!(token.never_expires());
    }

    #[tokio::test]
    async fn test_passthrough_claims_are_wrapped() {
        let issuer = RhIdentityIssuer::new(
            MapperPipeline::default().with(Arc::new(PassthroughMapper)),
            Arc::new(ManualClock::default()),
        );
        let subject = TrustResult::new("alice", "example.org").with_claim("org_id", "42");

        let token = issuer
            .issue(&RequestContext::new(), &issue_ctx(subject))
            .await
            .unwrap();

        let decoded: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(token.value).unwrap()).unwrap();
        assert_eq!(decoded, json!({"identity": {"org_id": "42"}}));
    }
}
