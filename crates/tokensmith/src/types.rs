//! Request-shaped inputs to the issuance engine
//!
//! These types are produced by the excluded collaborators (validators and
//! transport servers) and consumed read-only by issuers and mappers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::datasource::{DataSourceInput, DataSourceRegistry};
use crate::token::TokenType;

/// Attested identity produced by trust validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustResult {
    /// Subject identifier
    pub subject: String,
    /// Trust domain that vouched for the subject
    pub trust_domain: String,
    /// Attested claims, passed through untouched
    #[serde(default)]
    pub claims: Map<String, Value>,
}

impl TrustResult {
    /// Create a trust result without attested claims
    pub fn new(subject: impl Into<String>, trust_domain: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            trust_domain: trust_domain.into(),
            claims: Map::new(),
        }
    }

    /// Add an attested claim
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }
}

/// Metadata of the inbound request being authorized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttributes {
    /// HTTP method or RPC verb
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Host or authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Address of the calling peer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    /// Request headers, lower-cased names
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RequestAttributes {
    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A request to issue one or more tokens for a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Validated subject identity
    pub subject: TrustResult,
    /// Validated actor identity, when acting on behalf of the subject
    #[serde(default)]
    pub actor: Option<TrustResult>,
    /// Inbound request metadata
    #[serde(default)]
    pub request_attributes: RequestAttributes,
    /// Token types to issue, in order
    pub token_types: Vec<TokenType>,
    /// Requested scope, empty when none
    #[serde(default)]
    pub scope: String,
}

impl IssueRequest {
    /// Request for `token_types` on behalf of `subject`
    pub fn new(subject: TrustResult, token_types: impl IntoIterator<Item = TokenType>) -> Self {
        Self {
            subject,
            actor: None,
            request_attributes: RequestAttributes::default(),
            token_types: token_types.into_iter().collect(),
            scope: String::new(),
        }
    }

    /// Set the actor
    #[must_use]
    pub fn with_actor(mut self, actor: TrustResult) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the request attributes
    #[must_use]
    pub fn with_request_attributes(mut self, attributes: RequestAttributes) -> Self {
        self.request_attributes = attributes;
        self
    }

    /// Set the scope
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// Input shared by every issuer for one request
///
/// Built once per `issue_tokens` call. The audience is always the trust
/// domain of the service and issuers never change it.
#[derive(Debug, Clone)]
pub struct IssueContext {
    subject: TrustResult,
    actor: Option<TrustResult>,
    request_attributes: RequestAttributes,
    audience: String,
    scope: String,
    data_sources: Arc<DataSourceRegistry>,
}

impl IssueContext {
    /// Assemble the context for one request
    pub fn new(
        request: &IssueRequest,
        audience: impl Into<String>,
        data_sources: Arc<DataSourceRegistry>,
    ) -> Self {
        Self {
            subject: request.subject.clone(),
            actor: request.actor.clone(),
            request_attributes: request.request_attributes.clone(),
            audience: audience.into(),
            scope: request.scope.clone(),
            data_sources,
        }
    }

    /// Subject identity
    #[must_use]
    pub fn subject(&self) -> &TrustResult {
        &self.subject
    }

    /// Actor identity
    #[must_use]
    pub fn actor(&self) -> Option<&TrustResult> {
        self.actor.as_ref()
    }

    /// Request metadata
    #[must_use]
    pub fn request_attributes(&self) -> &RequestAttributes {
        &self.request_attributes
    }

    /// Audience, equal to the trust domain
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Requested scope
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Data sources available to mappers
    #[must_use]
    pub fn data_sources(&self) -> &DataSourceRegistry {
        &self.data_sources
    }

    /// Data source input derived from this context
    #[must_use]
    pub fn data_source_input(&self) -> DataSourceInput {
        DataSourceInput {
            subject: self.subject.clone(),
            actor: self.actor.clone(),
            request_attributes: self.request_attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut attributes = RequestAttributes::default();
        attributes
            .headers
            .insert("x-request-id".to_string(), "abc".to_string());
        assert_eq!(attributes.header("X-Request-Id"), Some("abc"));
        assert_eq!(attributes.header("missing"), None);
    }

    #[test]
    fn test_issue_request_deserializes_with_defaults() {
        let request: IssueRequest = serde_json::from_value(serde_json::json!({
            "subject": {"subject": "alice", "trust_domain": "example.org"},
            "token_types": [TokenType::TRANSACTION_TOKEN]
        }))
        .unwrap();

        assert_eq!(request.subject.subject, "alice");
        assert!(request.actor.is_none());
        assert!(request.scope.is_empty());
        assert_eq!(request.token_types, vec![TokenType::transaction_token()]);
    }

    #[test]
    fn test_issue_context_audience_is_fixed() {
        let request = IssueRequest::new(
            TrustResult::new("alice", "upstream.example"),
            [TokenType::access_token()],
        )
        .with_scope("read");
        let ctx = IssueContext::new(
            &request,
            "example.org",
            Arc::new(DataSourceRegistry::default()),
        );

        assert_eq!(ctx.audience(), "example.org");
        assert_eq!(ctx.scope(), "read");
        assert_eq!(ctx.data_source_input().subject.subject, "alice");
    }
}
