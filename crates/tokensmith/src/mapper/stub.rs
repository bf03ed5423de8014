//! Fixed claim set mapper

use async_trait::async_trait;

use super::{ClaimMapper, MapperInput};
use crate::claims::Claims;
use crate::context::RequestContext;
use crate::error::MapperError;

/// Returns the same claims for every request
#[derive(Debug, Clone, Default)]
pub struct StubMapper {
    claims: Claims,
}

impl StubMapper {
    /// Mapper returning `claims`
    #[must_use]
    pub fn new(claims: Claims) -> Self {
        Self { claims }
    }
}

#[async_trait]
impl ClaimMapper for StubMapper {
    fn name(&self) -> &str {
        "stub"
    }

    async fn map(
        &self,
        _ctx: &RequestContext,
        _input: &MapperInput<'_>,
    ) -> Result<Claims, MapperError> {
        Ok(self.claims.clone())
    }
}
