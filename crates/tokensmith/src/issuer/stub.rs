use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;

use super::Issuer;
use crate::clock::{Clock, saturating_add};
use crate::context::RequestContext;
use crate::error::IssuerResult;
use crate::token::{Token, TokenType};
use crate::types::IssueContext;

/// Issues a fixed token value
///
/// Ignores the request entirely; used for wiring tests and local setups.
#[derive(Debug, Clone)]
pub struct StubIssuer {
    token_type: TokenType,
    value: String,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl StubIssuer {
    /// Issuer returning `value` with a one hour lifetime
    pub fn new(token_type: TokenType, value: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            token_type,
            value: value.into(),
            lifetime: Duration::from_secs(3600),
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
impl Issuer for StubIssuer {
    async fn issue(&self, ctx: &RequestContext, _issue_ctx: &IssueContext) -> IssuerResult<Token> {
        if let Some(reason) = ctx.interrupted() {
            return Err(reason.into());
        }
        let now = self.clock.now();
        Ok(Token::new(
            self.value.clone(),
            self.token_type.clone(),
            now,
            saturating_add(now, self.lifetime),
        ))
    }

    async fn public_keys(&self, _ctx: &RequestContext) -> IssuerResult<Vec<Jwk>> {
        Ok(Vec::new())
    }
}
