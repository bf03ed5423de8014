use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;

use super::Issuer;
use crate::context::RequestContext;
use crate::error::{IssuerError, IssuerResult};
use crate::token::{Token, TokenType};
use crate::types::IssueContext;

/// Reserved slot for a signing JWT issuer
///
/// Registering it makes the token type known to the registry; issuing
/// fails with [`IssuerError::NotImplemented`] until a signer is wired in.
#[derive(Debug, Clone)]
pub struct JwtIssuer {
    token_type: TokenType,
}

impl JwtIssuer {
    /// Placeholder for `token_type`
    #[must_use]
    pub fn new(token_type: TokenType) -> Self {
        Self { token_type }
    }
}

#[async_trait]
impl Issuer for JwtIssuer {
    async fn issue(&self, _ctx: &RequestContext, _issue_ctx: &IssueContext) -> IssuerResult<Token> {
        Err(IssuerError::NotImplemented(format!(
            "JWT signing for {}",
            self.token_type
        )))
    }

    async fn public_keys(&self, _ctx: &RequestContext) -> IssuerResult<Vec<Jwk>> {
        Ok(Vec::new())
    }
}
