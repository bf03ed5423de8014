//! Token types and issued tokens

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URN identifying a token format and its semantics
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenType(String);

impl TokenType {
    /// Transaction token (draft-ietf-oauth-transaction-tokens)
    pub const TRANSACTION_TOKEN: &'static str = "urn:ietf:params:oauth:token-type:txn_token";
    /// OAuth access token (RFC 8693)
    pub const ACCESS_TOKEN: &'static str = "urn:ietf:params:oauth:token-type:access_token";
    /// OpenID Connect ID token (RFC 8693)
    pub const ID_TOKEN: &'static str = "urn:ietf:params:oauth:token-type:id_token";
    /// Generic JWT (RFC 8693)
    pub const JWT: &'static str = "urn:ietf:params:oauth:token-type:jwt";
    /// Red Hat identity header value
    pub const RH_IDENTITY: &'static str = "urn:redhat:params:oauth:token-type:rh-identity";

    /// Wrap a token type URN
    pub fn new(urn: impl Into<String>) -> Self {
        Self(urn.into())
    }

    /// Transaction token type
    #[must_use]
    pub fn transaction_token() -> Self {
        Self::new(Self::TRANSACTION_TOKEN)
    }

    /// Access token type
    #[must_use]
    pub fn access_token() -> Self {
        Self::new(Self::ACCESS_TOKEN)
    }

    /// Red Hat identity type
    #[must_use]
    pub fn rh_identity() -> Self {
        Self::new(Self::RH_IDENTITY)
    }

    /// The URN string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TokenType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for TokenType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TokenType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A produced credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Encoded token value
    pub value: String,
    /// Type of the token
    pub token_type: TokenType,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token stops being valid
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Create a token
    pub fn new(
        value: impl Into<String>,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value: value.into(),
            token_type,
            issued_at,
            expires_at,
        }
    }

    /// Whether the token carries no meaningful expiry
    #[must_use]
    pub fn never_expires(&self) -> bool {
        self.expires_at == DateTime::<Utc>::MAX_UTC
    }

    /// Remaining lifetime in whole seconds at `now`, zero once expired
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}
