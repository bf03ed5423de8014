//! Probe sequences and fail-fast behaviour of `issue_tokens`

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FailingIssuer, PendingIssuer, alice, recorded_service, stub_issuer};
use pretty_assertions::assert_eq;
use tokensmith::observer::{CompositeObserver, ProbeEvent, RecordingObserver, TracingObserver};
use tokensmith::{
    IssueRequest, IssuerError, RequestContext, TokenService, TokenServiceError, TokenType,
};

#[tokio::test]
async fn test_all_types_succeed() {
    let (service, observer, clock) = recorded_service();
    let access = TokenType::access_token();
    let txn = TokenType::transaction_token();
    service
        .registry()
        .register(access.clone(), stub_issuer(&access, "access", &clock));
    service
        .registry()
        .register(txn.clone(), stub_issuer(&txn, "txn", &clock));

    let tokens = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [txn.clone(), access.clone()]).with_scope("orders"),
        )
        .await
        .unwrap();

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[&txn].value, "txn");
    assert_eq!(tokens[&access].value, "access");

    let probe = observer.last().unwrap();
    assert!(probe.is_well_formed());
    assert_eq!(probe.scope, "orders");
    assert_eq!(
        probe.events,
        vec![
            ProbeEvent::TypeStarted(txn.clone()),
            ProbeEvent::TypeSucceeded(txn),
            ProbeEvent::TypeStarted(access.clone()),
            ProbeEvent::TypeSucceeded(access),
            ProbeEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_missing_issuer_fails_whole_request() {
    let (service, observer, clock) = recorded_service();
    let access = TokenType::access_token();
    let unknown = TokenType::new("urn:example:unknown");
    service
        .registry()
        .register(access.clone(), stub_issuer(&access, "access", &clock));

    let err = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [unknown.clone(), access]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TokenServiceError::IssuerNotFound { .. }));
    assert_eq!(err.token_type(), Some(&unknown));

    let probe = observer.last().unwrap();
    assert!(probe.is_well_formed());
    assert_eq!(
        probe.events,
        vec![
            ProbeEvent::TypeStarted(unknown.clone()),
            ProbeEvent::IssuerNotFound(unknown),
            ProbeEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_issuer_failure_discards_earlier_tokens() {
    let (service, observer, clock) = recorded_service();
    let access = TokenType::access_token();
    let broken = TokenType::new("urn:example:broken");
    service
        .registry()
        .register(access.clone(), stub_issuer(&access, "access", &clock));
    service
        .registry()
        .register(broken.clone(), Arc::new(FailingIssuer));

    let err = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [access.clone(), broken.clone()]),
        )
        .await
        .unwrap_err();

    match &err {
        TokenServiceError::IssuanceFailed { token_type, source } => {
            assert_eq!(token_type, &broken);
            assert!(matches!(source, IssuerError::Encoding(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    let probe = observer.last().unwrap();
    assert!(probe.is_well_formed());
    assert_eq!(
        probe.events,
        vec![
            ProbeEvent::TypeStarted(access.clone()),
            ProbeEvent::TypeSucceeded(access),
            ProbeEvent::TypeStarted(broken.clone()),
            ProbeEvent::TypeFailed(broken),
            ProbeEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_cancelled_request_reports_failure_and_end() {
    let (service, observer, clock) = recorded_service();
    let access = TokenType::access_token();
    service
        .registry()
        .register(access.clone(), stub_issuer(&access, "access", &clock));

    let ctx = RequestContext::new();
    ctx.cancel();
    let err = service
        .issue_tokens(&ctx, IssueRequest::new(alice(), [access.clone()]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TokenServiceError::IssuanceFailed {
            source: IssuerError::Cancelled,
            ..
        }
    ));
    let probe = observer.last().unwrap();
    assert!(probe.is_well_formed());
    assert_eq!(
        probe.events,
        vec![
            ProbeEvent::TypeStarted(access.clone()),
            ProbeEvent::TypeFailed(access),
            ProbeEvent::End,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_interrupts_slow_issuer() {
    let (service, observer, _clock) = recorded_service();
    let slow = TokenType::new("urn:example:slow");
    service
        .registry()
        .register(slow.clone(), Arc::new(PendingIssuer));

    let ctx = RequestContext::new().with_timeout(Duration::from_secs(2));
    let err = service
        .issue_tokens(&ctx, IssueRequest::new(alice(), [slow]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TokenServiceError::IssuanceFailed {
            source: IssuerError::DeadlineExceeded,
            ..
        }
    ));
    assert!(observer.last().unwrap().is_well_formed());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_future_still_ends_probe() {
    let (service, observer, _clock) = recorded_service();
    let slow = TokenType::new("urn:example:slow");
    service
        .registry()
        .register(slow.clone(), Arc::new(PendingIssuer));

    let ctx = RequestContext::new();
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        service.issue_tokens(&ctx, IssueRequest::new(alice(), [slow.clone()])),
    )
    .await;
    assert!(outcome.is_err());

    let probe = observer.last().unwrap();
    assert!(probe.is_well_formed());
    assert_eq!(
        probe.events,
        vec![
            ProbeEvent::TypeStarted(slow.clone()),
            ProbeEvent::TypeFailed(slow),
            ProbeEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_composite_observer_feeds_every_child() {
    let first = Arc::new(RecordingObserver::new());
    let second = Arc::new(RecordingObserver::new());
    let composite = CompositeObserver::default()
        .with(Arc::new(TracingObserver::new().with_trust_domain("example.org")))
        .with(first.clone())
        .with(second.clone());

    let service = TokenService::builder("example.org")
        .observer(Arc::new(composite))
        .build();
    let access = TokenType::access_token();
    service
        .registry()
        .register(access.clone(), Arc::new(FailingIssuer));

    let _ = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [access]),
        )
        .await;

    let first = first.last().unwrap();
    let second = second.last().unwrap();
    assert!(first.is_well_formed());
    assert_eq!(first.events, second.events);
}

#[tokio::test]
async fn test_concurrent_requests_get_independent_probes() {
    let (service, observer, clock) = recorded_service();
    let access = TokenType::access_token();
    service
        .registry()
        .register(access.clone(), stub_issuer(&access, "access", &clock));
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let access = access.clone();
            tokio::spawn(async move {
                service
                    .issue_tokens(&RequestContext::new(), IssueRequest::new(alice(), [access]))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let probes = observer.probes();
    assert_eq!(probes.len(), 8);
    assert!(probes.iter().all(|probe| probe.is_well_formed()));
}
