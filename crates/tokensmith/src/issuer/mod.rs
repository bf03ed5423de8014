//! Token issuers
//!
//! An [`Issuer`] turns an [`IssueContext`] into one [`Token`] of the type it
//! is registered for, and publishes the public keys that verify its tokens.
//! Every issuer except [`StubIssuer`] runs a [`MapperPipeline`] to decide
//! claims before encoding.
//!
//! [`MapperPipeline`]: crate::mapper::MapperPipeline

mod jwt;
mod rh_identity;
mod stub;
mod unsigned;

pub use jwt::JwtIssuer;
pub use rh_identity::RhIdentityIssuer;
pub use stub::StubIssuer;
pub use unsigned::UnsignedIssuer;

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;

use crate::context::RequestContext;
use crate::error::IssuerResult;
use crate::token::Token;
use crate::types::IssueContext;

/// Produces tokens of a single type
#[async_trait]
pub trait Issuer: Send + Sync + std::fmt::Debug {
    /// Issue one token for `issue_ctx`
    ///
    /// # Errors
    ///
    /// Returns [`IssuerError`](crate::error::IssuerError) when claim mapping
    /// or encoding fails, or when the request is interrupted.
    async fn issue(&self, ctx: &RequestContext, issue_ctx: &IssueContext) -> IssuerResult<Token>;

    /// Keys that verify tokens from this issuer; empty for unsigned formats
    ///
    /// # Errors
    ///
    /// Returns [`IssuerError::Keys`](crate::error::IssuerError::Keys) when
    /// the keys cannot be loaded.
    async fn public_keys(&self, ctx: &RequestContext) -> IssuerResult<Vec<Jwk>>;
}
