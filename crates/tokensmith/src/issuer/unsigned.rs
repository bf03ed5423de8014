//! Unsecured JWT issuer
//!
//! Emits `base64url(header).base64url(claims).` with the `none` algorithm.
//! Mapper output is the payload; `aud`, `iat`, `exp` and `scope` are set by
//! the issuer afterwards and cannot be overridden by mappers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::Jwk;
use serde_json::json;

use super::Issuer;
use crate::clock::{Clock, saturating_add};
use crate::context::RequestContext;
use crate::error::IssuerResult;
use crate::mapper::MapperPipeline;
use crate::token::{Token, TokenType};
use crate::types::IssueContext;

const DEFAULT_LIFETIME: Duration = Duration::from_secs(300);

/// Issues unsigned JWTs
#[derive(Debug, Clone)]
pub struct UnsignedIssuer {
    token_type: TokenType,
    mappers: MapperPipeline,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl UnsignedIssuer {
    /// Issuer with a five minute token lifetime
    pub fn new(token_type: TokenType, mappers: MapperPipeline, clock: Arc<dyn Clock>) -> Self {
        Self {
            token_type,
            mappers,
            lifetime: DEFAULT_LIFETIME,
            clock,
        }
    }

    /// Override the token lifetime
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }
}

#[async_trait]
impl Issuer for UnsignedIssuer {
    async fn issue(&self, ctx: &RequestContext, issue_ctx: &IssueContext) -> IssuerResult<Token> {
        let mut claims = self.mappers.run_for(ctx, issue_ctx).await?;

        let issued_at = self.clock.now();
        let expires_at = saturating_add(issued_at, self.lifetime);
        claims.insert("aud", issue_ctx.audience());
        claims.insert("iat", issued_at.timestamp());
        claims.insert("exp", expires_at.timestamp());
        if !issue_ctx.scope().is_empty() {
            claims.insert("scope", issue_ctx.scope());
        }

        let header = serde_json::to_vec(&json!({"alg": "none", "typ": "JWT"}))?;
        let payload = serde_json::to_vec(&claims)?;
        let value = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );

        Ok(Token::new(value, self.token_type.clone(), issued_at, expires_at))
    }

    async fn public_keys(&self, _ctx: &RequestContext) -> IssuerResult<Vec<Jwk>> {
        Ok(Vec::new())
    }
}
