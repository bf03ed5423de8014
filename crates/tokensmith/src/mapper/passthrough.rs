//! Subject attestation passthrough

use async_trait::async_trait;

use super::{ClaimMapper, MapperInput};
use crate::claims::Claims;
use crate::context::RequestContext;
use crate::error::MapperError;

/// Copies the subject's attested claims unmodified
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMapper;

#[async_trait]
impl ClaimMapper for PassthroughMapper {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn map(
        &self,
        _ctx: &RequestContext,
        input: &MapperInput<'_>,
    ) -> Result<Claims, MapperError> {
        Ok(Claims::from(input.subject.claims.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::test_support::InputFixture;
    use crate::types::TrustResult;
    use serde_json::json;

    #[tokio::test]
    async fn test_copies_subject_claims() {
        let subject = TrustResult::new("alice", "example.org")
            .with_claim("sub", "alice")
            .with_claim("groups", json!(["eng"]));
        let fixture = InputFixture::new(subject);

        let claims = PassthroughMapper
            .map(&RequestContext::new(), &fixture.input())
            .await
            .unwrap();
        assert_eq!(
            claims.into_value(),
            json!({"sub": "alice", "groups": ["eng"]})
        );
    }
}
