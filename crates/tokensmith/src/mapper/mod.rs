//! Claim mappers
//!
//! A [`ClaimMapper`] turns a [`MapperInput`] into a partial [`Claims`] set.
//! Issuers run an ordered [`MapperPipeline`]; outputs merge left to right
//! and later mappers win on key collisions, so operators express override
//! precedence through mapper order.

mod passthrough;
mod request_attributes;
mod stub;
mod template;

pub use passthrough::PassthroughMapper;
pub use request_attributes::RequestAttributesMapper;
pub use stub::StubMapper;
pub use template::TemplateMapper;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::claims::Claims;
use crate::context::RequestContext;
use crate::datasource::{DataSourceInput, DataSourceRegistry};
use crate::error::MapperError;
use crate::types::{IssueContext, RequestAttributes, TrustResult};

/// Everything a mapper may read while producing claims
#[derive(Debug, Clone, Copy)]
pub struct MapperInput<'a> {
    /// Subject identity
    pub subject: &'a TrustResult,
    /// Actor identity
    pub actor: Option<&'a TrustResult>,
    /// Request metadata
    pub request_attributes: &'a RequestAttributes,
    /// Enrichment sources
    pub data_sources: &'a DataSourceRegistry,
    /// Input to pass to enrichment sources
    pub data_source_input: &'a DataSourceInput,
}

/// Produces a partial claim set
#[async_trait]
pub trait ClaimMapper: Send + Sync + std::fmt::Debug {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Produce claims for `input`
    async fn map(
        &self,
        ctx: &RequestContext,
        input: &MapperInput<'_>,
    ) -> Result<Claims, MapperError>;
}

/// Ordered list of mappers whose outputs merge left to right
#[derive(Debug, Clone, Default)]
pub struct MapperPipeline {
    mappers: Vec<Arc<dyn ClaimMapper>>,
}

impl MapperPipeline {
    /// Pipeline running `mappers` in the given order
    #[must_use]
    pub fn new(mappers: Vec<Arc<dyn ClaimMapper>>) -> Self {
        Self { mappers }
    }

    /// Append a mapper; it overrides every mapper before it
    #[must_use]
    pub fn with(mut self, mapper: Arc<dyn ClaimMapper>) -> Self {
        self.mappers.push(mapper);
        self
    }

    /// Number of mappers
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    /// Whether the pipeline has no mappers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Run every mapper against `input` and merge the results
    ///
    /// # Errors
    ///
    /// Returns the first mapper failure; later mappers do not run.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        input: &MapperInput<'_>,
    ) -> Result<Claims, MapperError> {
        let mut claims = Claims::new();
        for mapper in &self.mappers {
            let partial = mapper.map(ctx, input).await?;
            debug!(
                mapper = %mapper.name(),
                claim_count = partial.len(),
                "Claim mapper produced claims"
            );
            claims.merge(partial);
        }
        Ok(claims)
    }

    /// Run the pipeline for an issue context
    ///
    /// # Errors
    ///
    /// Returns the first mapper failure.
    pub async fn run_for(
        &self,
        ctx: &RequestContext,
        issue_ctx: &IssueContext,
    ) -> Result<Claims, MapperError> {
        let data_source_input = issue_ctx.data_source_input();
        let input = MapperInput {
            subject: issue_ctx.subject(),
            actor: issue_ctx.actor(),
            request_attributes: issue_ctx.request_attributes(),
            data_sources: issue_ctx.data_sources(),
            data_source_input: &data_source_input,
        };
        self.run(ctx, &input).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Owns the values a [`MapperInput`] borrows
    pub(crate) struct InputFixture {
        pub subject: TrustResult,
        pub actor: Option<TrustResult>,
        pub request_attributes: RequestAttributes,
        pub data_sources: DataSourceRegistry,
        pub data_source_input: DataSourceInput,
    }

    impl InputFixture {
        pub(crate) fn new(subject: TrustResult) -> Self {
            Self::with_sources(subject, DataSourceRegistry::default())
        }

        pub(crate) fn with_sources(subject: TrustResult, data_sources: DataSourceRegistry) -> Self {
            let data_source_input = DataSourceInput {
                subject: subject.clone(),
                ..Default::default()
            };
            Self {
                subject,
                actor: None,
                request_attributes: RequestAttributes::default(),
                data_sources,
                data_source_input,
            }
        }

        pub(crate) fn input(&self) -> MapperInput<'_> {
            MapperInput {
                subject: &self.subject,
                actor: self.actor.as_ref(),
                request_attributes: &self.request_attributes,
                data_sources: &self.data_sources,
                data_source_input: &self.data_source_input,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InputFixture;
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl ClaimMapper for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn map(
            &self,
            _ctx: &RequestContext,
            _input: &MapperInput<'_>,
        ) -> Result<Claims, MapperError> {
            Err(MapperError::evaluation("failing", "boom"))
        }
    }

    fn stub(claims: serde_json::Value) -> Arc<dyn ClaimMapper> {
        Arc::new(StubMapper::new(Claims::try_from(claims).unwrap()))
    }

    #[tokio::test]
    async fn test_later_mappers_override_earlier_ones() {
        let fixture = InputFixture::new(TrustResult::new("alice", "example.org"));
        let pipeline = MapperPipeline::new(vec![
            stub(json!({"a": 1, "b": 2})),
            stub(json!({"b": 3})),
        ]);

        let claims = pipeline
            .run(&RequestContext::new(), &fixture.input())
            .await
            .unwrap();
        assert_eq!(claims.into_value(), json!({"a": 1, "b": 3}));
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let fixture = InputFixture::new(TrustResult::new("alice", "example.org"));
        let pipeline = MapperPipeline::default()
            .with(Arc::new(Failing))
            .with(stub(json!({"a": 1})));

        let err = pipeline
            .run(&RequestContext::new(), &fixture.input())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failing"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_yields_empty_claims() {
        let fixture = InputFixture::new(TrustResult::new("alice", "example.org"));
        let claims = MapperPipeline::default()
            .run(&RequestContext::new(), &fixture.input())
            .await
            .unwrap();
        assert!(claims.is_empty());
    }
}
