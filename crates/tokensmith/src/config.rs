//! Declarative engine configuration
//!
//! An [`EngineConfig`] describes the trust domain, the issuer for each token
//! type with its claim mappers, and the data sources mappers may consult.
//! Issuers, mappers and data sources are discriminated by a `type` field:
//!
//! ```yaml
//! trust_domain: example.org
//! cache:
//!   max_entries: 10000
//! datasources:
//!   - name: directory
//!     type: http
//!     url: "https://directory.internal/users/{{subject.subject}}"
//!     cache_ttl_secs: 60
//! issuers:
//!   - token_type: "urn:redhat:params:oauth:token-type:rh-identity"
//!     type: rh-identity
//!     mappers:
//!       - type: passthrough
//!       - type: template
//!         datasources: [directory]
//!         template:
//!           org_id: "{{datasources.directory.org_id}}"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::datasource::CacheOptions;
use crate::error::ConfigError;
use crate::token::TokenType;

/// Environment variable prefix for overrides, e.g. `TOKENSMITH__TRUST_DOMAIN`
pub const DEFAULT_ENV_PREFIX: &str = "TOKENSMITH";

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trust domain, used as the audience of every token
    pub trust_domain: String,
    /// One issuer per token type
    #[serde(default)]
    pub issuers: Vec<IssuerConfig>,
    /// Data sources available to template mappers
    #[serde(default)]
    pub datasources: Vec<DataSourceConfig>,
    /// Data source cache tuning
    #[serde(default)]
    pub cache: CacheOptions,
}

/// Issuer registered for one token type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Token type URN the issuer serves
    pub token_type: TokenType,
    /// Issuer variant
    #[serde(flatten)]
    pub kind: IssuerKind,
}

/// Issuer variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IssuerKind {
    /// Fixed token value
    Stub {
        /// Token value returned for every request
        value: String,
        /// Token lifetime in seconds
        #[serde(default)]
        lifetime_secs: Option<u64>,
    },
    /// Unsecured JWT
    Unsigned {
        /// Token lifetime in seconds
        #[serde(default)]
        lifetime_secs: Option<u64>,
        /// Claim mappers, in merge order
        #[serde(default)]
        mappers: Vec<MapperConfig>,
    },
    /// Base64 identity document
    RhIdentity {
        /// Claim mappers, in merge order
        #[serde(default)]
        mappers: Vec<MapperConfig>,
    },
    /// Signed JWT, not yet available
    Jwt {},
}

impl IssuerKind {
    /// Configured mappers
    #[must_use]
    pub fn mappers(&self) -> &[MapperConfig] {
        match self {
            Self::Unsigned { mappers, .. } | Self::RhIdentity { mappers } => mappers,
            Self::Stub { .. } | Self::Jwt {} => &[],
        }
    }
}

/// Claim mapper variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MapperConfig {
    /// JSON template with Handlebars leaves
    Template {
        /// Name used in errors, defaults to `template`
        #[serde(default)]
        name: Option<String>,
        /// Claim template; must be an object
        template: Value,
        /// Data sources fetched before rendering
        #[serde(default)]
        datasources: Vec<String>,
    },
    /// Copy the subject's attested claims
    Passthrough,
    /// Project request metadata into one claim
    RequestAttributes {
        /// Claim name, defaults to `req_ctx`
        #[serde(default)]
        claim: Option<String>,
        /// Headers to copy
        #[serde(default)]
        headers: Vec<String>,
    },
    /// Fixed claims
    Stub {
        /// Claims returned for every request
        #[serde(default)]
        claims: Map<String, Value>,
    },
}

/// Named data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Name template mappers refer to
    pub name: String,
    /// Source variant
    #[serde(flatten)]
    pub kind: DataSourceKind,
}

/// Data source variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DataSourceKind {
    /// Fixed payload
    Static {
        /// Payload returned for every fetch
        value: Value,
    },
    /// JSON over HTTP GET
    Http {
        /// URL template
        url: String,
        /// Header templates
        #[serde(default)]
        headers: BTreeMap<String, String>,
        /// Request timeout in seconds
        #[serde(default)]
        timeout_secs: Option<u64>,
        /// Cache lifetime in seconds; zero caches forever, absent disables caching
        #[serde(default)]
        cache_ttl_secs: Option<u64>,
    },
}

impl EngineConfig {
    /// Minimal configuration for `trust_domain`
    pub fn new(trust_domain: impl Into<String>) -> Self {
        Self {
            trust_domain: trust_domain.into(),
            issuers: Vec::new(),
            datasources: Vec::new(),
            cache: CacheOptions::default(),
        }
    }

    /// Load from a file, with `TOKENSMITH__*` environment overrides
    ///
    /// The format follows the extension: `toml`, `yaml`/`yml` or `json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, has an unsupported
    /// extension, fails to deserialize or fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, DEFAULT_ENV_PREFIX)
    }

    /// Load from a file with a custom environment prefix
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_prefix(path: impl AsRef<Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File, FileFormat};

        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        let file = path
            .to_str()
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

        let loaded: Self = Config::builder()
            .add_source(File::new(file, format))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check cross-references the type system cannot
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty trust domain, a token
    /// type configured twice, a data source name used twice, or a template
    /// mapper naming an unknown data source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trust_domain.trim().is_empty() {
            return Err(ConfigError::Invalid("trust_domain must not be empty".into()));
        }

        let mut sources = HashSet::new();
        for source in &self.datasources {
            if !sources.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "data source '{}' is defined more than once",
                    source.name
                )));
            }
        }

        let mut token_types = HashSet::new();
        for issuer in &self.issuers {
            if !token_types.insert(&issuer.token_type) {
                return Err(ConfigError::Invalid(format!(
                    "token type '{}' has more than one issuer",
                    issuer.token_type
                )));
            }

            for mapper in issuer.kind.mappers() {
                let MapperConfig::Template { datasources, .. } = mapper else {
                    continue;
                };
                if let Some(missing) = datasources
                    .iter()
                    .find(|name| !sources.contains(name.as_str()))
                {
                    return Err(ConfigError::Invalid(format!(
                        "issuer for '{}' references unknown data source '{missing}'",
                        issuer.token_type
                    )));
                }
            }
        }

        Ok(())
    }
}
