//! Error types for token issuance
//!
//! Each layer has its own error enum. Lower layers convert into higher ones
//! with `#[from]`, so a failed issuance still names the failing token type,
//! mapper and data source.

use thiserror::Error;

use crate::context::Interrupted;
use crate::token::TokenType;

/// Data source lookup and fetch errors
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    /// No data source registered under the name
    #[error("data source '{0}' not found")]
    NotFound(String),

    /// The source failed to produce a result
    #[error("data source '{source_name}' fetch failed: {message}")]
    FetchFailed {
        /// Name of the failing source
        source_name: String,
        /// Failure description
        message: String,
    },

    /// The cache key could not be derived from the input
    #[error("data source '{source_name}' cache key failed: {message}")]
    CacheKey {
        /// Name of the failing source
        source_name: String,
        /// Failure description
        message: String,
    },

    /// The source definition is unusable
    #[error("data source '{source_name}' is misconfigured: {message}")]
    Configuration {
        /// Name of the misconfigured source
        source_name: String,
        /// Failure description
        message: String,
    },

    /// The request was cancelled or timed out during the fetch
    #[error("data source fetch interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

impl DataSourceError {
    /// Shorthand for [`DataSourceError::FetchFailed`]
    pub fn fetch(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::FetchFailed {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

/// Claim mapper errors
#[derive(Debug, Clone, Error)]
pub enum MapperError {
    /// Template or expression evaluation failed
    #[error("mapper '{mapper}' evaluation failed: {message}")]
    Evaluation {
        /// Name of the failing mapper
        mapper: String,
        /// Failure description
        message: String,
    },

    /// The mapper produced something other than a claim object
    #[error("mapper '{mapper}' produced a non-object claim set")]
    NotAnObject {
        /// Name of the failing mapper
        mapper: String,
    },

    /// An enrichment lookup failed
    #[error("mapper '{mapper}' enrichment failed: {source}")]
    DataSource {
        /// Name of the failing mapper
        mapper: String,
        /// Underlying data source error
        #[source]
        source: DataSourceError,
    },
}

impl MapperError {
    /// Shorthand for [`MapperError::Evaluation`]
    pub fn evaluation(mapper: impl Into<String>, message: impl ToString) -> Self {
        Self::Evaluation {
            mapper: mapper.into(),
            message: message.to_string(),
        }
    }

    /// Whether the failure came from a cancelled or timed-out request
    #[must_use]
    pub fn interrupted(&self) -> Option<Interrupted> {
        match self {
            Self::DataSource {
                source: DataSourceError::Interrupted(reason),
                ..
            } => Some(*reason),
            _ => None,
        }
    }
}

/// Issuer errors
#[derive(Debug, Clone, Error)]
pub enum IssuerError {
    /// The claim mapper pipeline failed
    #[error(transparent)]
    Mapper(#[from] MapperError),

    /// The claim set could not be encoded
    #[error("token encoding failed: {0}")]
    Encoding(String),

    /// The issuer variant is reserved but not available
    #[error("issuer not implemented: {0}")]
    NotImplemented(String),

    /// Public key retrieval failed
    #[error("public key retrieval failed: {0}")]
    Keys(String),

    /// The request was cancelled
    #[error("issuance cancelled")]
    Cancelled,

    /// The request deadline passed
    #[error("issuance deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for IssuerError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl From<serde_json::Error> for IssuerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl IssuerError {
    /// Whether the failure was caused by cancellation or the deadline
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Cancelled | Self::DeadlineExceeded => true,
            Self::Mapper(mapper) => mapper.interrupted().is_some(),
            _ => false,
        }
    }
}

/// Issuer registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No issuer is registered for the token type
    #[error("no issuer registered for token type '{0}'")]
    NotFound(TokenType),
}

/// One issuer's public key failure
#[derive(Debug, Clone)]
pub struct IssuerKeyFailure {
    /// Token type the failing issuer is registered for
    pub token_type: TokenType,
    /// What went wrong
    pub error: IssuerError,
}

/// One or more issuers failed to return their public keys
///
/// Keys from issuers that succeeded are still available in
/// [`partial_keys`](Self::partial_keys).
#[derive(Debug, Clone, Error)]
#[error("{}", describe_key_failures(.failures))]
pub struct KeyRetrievalError {
    /// Keys collected from the issuers that succeeded
    pub partial_keys: Vec<jsonwebtoken::jwk::Jwk>,
    /// Every failing issuer
    pub failures: Vec<IssuerKeyFailure>,
}

impl KeyRetrievalError {
    /// Token types whose issuers failed
    pub fn failed_token_types(&self) -> impl Iterator<Item = &TokenType> {
        self.failures.iter().map(|failure| &failure.token_type)
    }

    /// Take the keys that were collected despite the failures
    #[must_use]
    pub fn into_partial_keys(self) -> Vec<jsonwebtoken::jwk::Jwk> {
        self.partial_keys
    }
}

fn describe_key_failures(failures: &[IssuerKeyFailure]) -> String {
    let noun = if failures.len() == 1 { "issuer" } else { "issuers" };
    let details = failures
        .iter()
        .map(|failure| format!("{}: {}", failure.token_type, failure.error))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "failed to retrieve public keys from {} {noun}: {details}",
        failures.len()
    )
}

/// Errors returned to callers of `TokenService::issue_tokens`
#[derive(Debug, Clone, Error)]
pub enum TokenServiceError {
    /// The request itself is unusable
    #[error("invalid issue request: {0}")]
    InvalidRequest(String),

    /// A requested token type has no issuer
    #[error("issuer not found for token type '{token_type}'")]
    IssuerNotFound {
        /// The unregistered token type
        token_type: TokenType,
        /// Registry lookup failure
        #[source]
        source: RegistryError,
    },

    /// An issuer failed
    #[error("issuance failed for token type '{token_type}': {source}")]
    IssuanceFailed {
        /// The token type being issued
        token_type: TokenType,
        /// Issuer failure
        #[source]
        source: IssuerError,
    },
}

impl TokenServiceError {
    /// Token type the failure relates to
    #[must_use]
    pub fn token_type(&self) -> Option<&TokenType> {
        match self {
            Self::InvalidRequest(_) => None,
            Self::IssuerNotFound { token_type, .. } | Self::IssuanceFailed { token_type, .. } => {
                Some(token_type)
            }
        }
    }
}

/// Configuration loading and engine construction errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(std::path::PathBuf),

    /// The file extension is not toml, yaml, yml or json
    #[error("unsupported configuration format: {}", .0.display())]
    UnsupportedFormat(std::path::PathBuf),

    /// The configuration source could not be read or deserialized
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration is structurally invalid
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A component could not be constructed
    #[error("failed to build {component}: {message}")]
    Build {
        /// Component being built
        component: String,
        /// Failure description
        message: String,
    },
}

/// Result alias for issuer operations
pub type IssuerResult<T> = Result<T, IssuerError>;

/// Result alias for the token service
pub type TokenServiceResult<T> = Result<T, TokenServiceError>;
