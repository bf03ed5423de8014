//! Data source caching as seen through the registry and template mappers

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingSource, alice, decode_rh_identity};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokensmith::datasource::{CacheOptions, DataSourceInput, DataSourceRegistry};
use tokensmith::issuer::RhIdentityIssuer;
use tokensmith::mapper::{MapperPipeline, TemplateMapper};
use tokensmith::{IssueRequest, ManualClock, RequestContext, TokenService, TokenType};

fn input(subject: &str) -> DataSourceInput {
    DataSourceInput {
        subject: tokensmith::TrustResult::new(subject, "example.org"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_zero_ttl_fetches_once() {
    let clock = Arc::new(ManualClock::default());
    let source = Arc::new(CountingSource::new("dir", Duration::ZERO));
    let mut registry = DataSourceRegistry::new(clock.clone());
    registry.register(source.clone());

    let ctx = RequestContext::new();
    for _ in 0..5 {
        let result = registry.fetch(&ctx, "dir", &input("alice")).await.unwrap();
        assert_eq!(result.value()["call"], json!(1));
        clock.advance(Duration::from_secs(86_400));
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_ttl_expiry_refetches() {
    let clock = Arc::new(ManualClock::default());
    let source = Arc::new(CountingSource::new("dir", Duration::from_secs(30)));
    let mut registry = DataSourceRegistry::new(clock.clone());
    registry.register(source.clone());

    let ctx = RequestContext::new();
    registry.fetch(&ctx, "dir", &input("alice")).await.unwrap();
    clock.advance(Duration::from_secs(29));
    registry.fetch(&ctx, "dir", &input("alice")).await.unwrap();
    assert_eq!(source.calls(), 1);

    clock.advance(Duration::from_secs(2));
    let refreshed = registry.fetch(&ctx, "dir", &input("alice")).await.unwrap();
    assert_eq!(refreshed.value()["call"], json!(2));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_keys_are_cached_independently() {
    let source = Arc::new(CountingSource::new("dir", Duration::ZERO));
    let mut registry = DataSourceRegistry::new(Arc::new(ManualClock::default()));
    registry.register(source.clone());

    let ctx = RequestContext::new();
    for subject in ["alice", "bob", "alice", "bob"] {
        registry.fetch(&ctx, "dir", &input(subject)).await.unwrap();
    }
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_bounded_cache_still_serves_results() {
    let source = Arc::new(CountingSource::new("dir", Duration::ZERO));
    let mut registry = DataSourceRegistry::with_cache_options(
        Arc::new(ManualClock::default()),
        CacheOptions {
            max_entries: Some(1),
        },
    );
    registry.register(source.clone());

    let ctx = RequestContext::new();
    registry.fetch(&ctx, "dir", &input("alice")).await.unwrap();
    let bob = registry.fetch(&ctx, "dir", &input("bob")).await.unwrap();
    assert_eq!(bob.value()["subject"], json!("bob"));
    registry.fetch(&ctx, "dir", &input("alice")).await.unwrap();
    registry.fetch(&ctx, "dir", &input("bob")).await.unwrap();

    // alice stays cached, bob never fits
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_enrichment_is_shared_across_token_types_only_through_cache() {
    let clock = Arc::new(ManualClock::default());
    let source = Arc::new(CountingSource::new("dir", Duration::ZERO));
    let mut registry = DataSourceRegistry::new(clock.clone());
    registry.register(source.clone());

    let mapper = || {
        Arc::new(
            TemplateMapper::new(
                "enrich",
                json!({"sub": "{{subject.subject}}", "call": "json:{{datasources.dir.call}}"}),
                ["dir"],
            )
            .unwrap(),
        )
    };
    let first = TokenType::rh_identity();
    let second = TokenType::new("urn:example:identity-copy");

    let service = TokenService::builder("example.org")
        .data_sources(Arc::new(registry))
        .build();
    service.registry().register(
        first.clone(),
        Arc::new(RhIdentityIssuer::new(
            MapperPipeline::default().with(mapper()),
            clock.clone(),
        )),
    );
    service.registry().register(
        second.clone(),
        Arc::new(RhIdentityIssuer::with_token_type(
            second.clone(),
            MapperPipeline::default().with(mapper()),
            clock.clone(),
        )),
    );

    let tokens = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [first.clone(), second.clone()]),
        )
        .await
        .unwrap();

    let expected = json!({"identity": {"sub": "alice", "call": 1}});
    assert_eq!(decode_rh_identity(&tokens[&first].value), expected);
    assert_eq!(decode_rh_identity(&tokens[&second].value), expected);
    assert_eq!(source.calls(), 1);
}
