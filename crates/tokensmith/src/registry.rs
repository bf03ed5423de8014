//! Issuer registry
//!
//! Maps each token type to the issuer that produces it. Built at startup and
//! read on every request; registration after startup is allowed and takes a
//! short write lock.

use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::{IssuerKeyFailure, KeyRetrievalError, RegistryError};
use crate::issuer::Issuer;
use crate::token::TokenType;

/// Token type to issuer directory
#[derive(Debug, Default)]
pub struct IssuerRegistry {
    issuers: RwLock<HashMap<TokenType, Arc<dyn Issuer>>>,
}

impl IssuerRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `issuer` for `token_type`, replacing any previous issuer
    pub fn register(&self, token_type: TokenType, issuer: Arc<dyn Issuer>) {
        debug!(token_type = %token_type, "Registering issuer");
        if self.issuers.write().insert(token_type.clone(), issuer).is_some() {
            warn!(token_type = %token_type, "Replaced existing issuer");
        }
    }

    /// Issuer for `token_type`
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when nothing is registered.
    pub fn get_issuer(&self, token_type: &TokenType) -> Result<Arc<dyn Issuer>, RegistryError> {
        self.issuers
            .read()
            .get(token_type)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(token_type.clone()))
    }

    /// Registered token types, sorted
    #[must_use]
    pub fn list_token_types(&self) -> Vec<TokenType> {
        let mut types: Vec<TokenType> = self.issuers.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Number of registered issuers
    #[must_use]
    pub fn len(&self) -> usize {
        self.issuers.read().len()
    }

    /// Whether no issuer is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issuers.read().is_empty()
    }

    /// Public keys of every registered issuer
    ///
    /// Each issuer is asked independently; one failing issuer does not hide
    /// the keys of the others.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRetrievalError`] listing every failing issuer when at
    /// least one fails. The keys of the issuers that succeeded are kept in
    /// [`KeyRetrievalError::partial_keys`].
    pub async fn get_all_public_keys(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Jwk>, KeyRetrievalError> {
        // Snapshot so no lock is held across the awaits
        let mut issuers: Vec<(TokenType, Arc<dyn Issuer>)> = self
            .issuers
            .read()
            .iter()
            .map(|(token_type, issuer)| (token_type.clone(), Arc::clone(issuer)))
            .collect();
        issuers.sort_by(|a, b| a.0.cmp(&b.0));

        let mut keys = Vec::new();
        let mut failures = Vec::new();
        for (token_type, issuer) in issuers {
            match issuer.public_keys(ctx).await {
                Ok(mut issuer_keys) => keys.append(&mut issuer_keys),
                Err(error) => {
                    warn!(
                        token_type = %token_type,
                        error = %error,
                        "Issuer public key retrieval failed"
                    );
                    failures.push(IssuerKeyFailure { token_type, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(keys)
        } else {
            Err(KeyRetrievalError {
                partial_keys: keys,
                failures,
            })
        }
    }

    /// Public keys wrapped as a JWKS document
    ///
    /// # Errors
    ///
    /// Same as [`get_all_public_keys`](Self::get_all_public_keys).
    pub async fn jwks(&self, ctx: &RequestContext) -> Result<JwkSet, KeyRetrievalError> {
        let keys = self.get_all_public_keys(ctx).await?;
        Ok(JwkSet { keys })
    }
}
