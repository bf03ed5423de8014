//! Request metadata projection

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ClaimMapper, MapperInput};
use crate::claims::Claims;
use crate::context::RequestContext;
use crate::error::MapperError;

/// Default claim name, the transaction token request context
pub const DEFAULT_REQUEST_CLAIM: &str = "req_ctx";

/// Projects request metadata into a single object claim
///
/// Produces `{"req_ctx": {"req_ip": .., "method": .., "path": .., "host": ..,
/// "headers": {..}}}`; absent attributes are omitted and only allow-listed
/// headers are copied.
#[derive(Debug, Clone)]
pub struct RequestAttributesMapper {
    claim: String,
    headers: Vec<String>,
}

impl Default for RequestAttributesMapper {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_CLAIM)
    }
}

impl RequestAttributesMapper {
    /// Mapper writing into `claim`
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            headers: Vec::new(),
        }
    }

    /// Copy these headers (case-insensitive) into the claim
    #[must_use]
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|h| h.into().to_ascii_lowercase())
            .collect();
        self
    }
}

#[async_trait]
impl ClaimMapper for RequestAttributesMapper {
    fn name(&self) -> &str {
        "request-attributes"
    }

    async fn map(
        &self,
        _ctx: &RequestContext,
        input: &MapperInput<'_>,
    ) -> Result<Claims, MapperError> {
        let attributes = input.request_attributes;
        let mut context = Map::new();

        let fields = [
            ("req_ip", &attributes.source_address),
            ("method", &attributes.method),
            ("path", &attributes.path),
            ("host", &attributes.host),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                context.insert(name.to_string(), Value::String(value.clone()));
            }
        }

        let headers: Map<String, Value> = self
            .headers
            .iter()
            .filter_map(|name| {
                attributes
                    .header(name)
                    .map(|value| (name.clone(), Value::String(value.to_string())))
            })
            .collect();
        if !headers.is_empty() {
            context.insert("headers".to_string(), Value::Object(headers));
        }

        let mut claims = Claims::new();
        claims.insert(self.claim.clone(), Value::Object(context));
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::test_support::InputFixture;
    use crate::types::TrustResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_projects_present_attributes_and_allowed_headers() {
        let mut fixture = InputFixture::new(TrustResult::new("alice", "example.org"));
        fixture.request_attributes.method = Some("GET".into());
        fixture.request_attributes.path = Some("/orders/7".into());
        fixture.request_attributes.source_address = Some("10.0.0.9".into());
        fixture
            .request_attributes
            .headers
            .insert("x-request-id".into(), "r-1".into());
        fixture
            .request_attributes
            .headers
            .insert("authorization".into(), "Bearer secret".into());

        let mapper = RequestAttributesMapper::default().with_headers(["X-Request-Id"]);
        let claims = mapper
            .map(&RequestContext::new(), &fixture.input())
            .await
            .unwrap();

        assert_eq!(
            claims.into_value(),
            json!({
                "req_ctx": {
                    "req_ip": "10.0.0.9",
                    "method": "GET",
                    "path": "/orders/7",
                    "headers": {"x-request-id": "r-1"}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_custom_claim_name() {
        let fixture = InputFixture::new(TrustResult::new("alice", "example.org"));
        let claims = RequestAttributesMapper::new("request")
            .map(&RequestContext::new(), &fixture.input())
            .await
            .unwrap();
        assert_eq!(claims.get("request"), Some(&json!({})));
    }
}
