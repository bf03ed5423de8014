//! Configuration file to issued token

mod common;

use std::io::Write;
use std::sync::Arc;

use common::{alice, decode_rh_identity};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokensmith::observer::RecordingObserver;
use tokensmith::{
    Clock, ConfigError, EngineConfig, IssueRequest, ManualClock, RequestAttributes,
    RequestContext, TokenType, build_service,
};

const ENGINE_YAML: &str = r#"
trust_domain: example.org
cache:
  max_entries: 100
datasources:
  - name: tenants
    type: static
    value:
      org_id: "42"
      entitlements: [insights, ansible]
issuers:
  - token_type: "urn:redhat:params:oauth:token-type:rh-identity"
    type: rh-identity
    mappers:
      - type: passthrough
      - type: template
        name: identity
        datasources: [tenants]
        template:
          org_id: "{{datasources.tenants.org_id}}"
          entitlements: "json:{{json datasources.tenants.entitlements}}"
          user:
            username: "{{subject.subject}}"
  - token_type: "urn:ietf:params:oauth:token-type:txn_token"
    type: unsigned
    lifetime_secs: 60
    mappers:
      - type: request-attributes
        headers: [x-request-id]
  - token_type: "urn:ietf:params:oauth:token-type:access_token"
    type: jwt
"#;

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_yaml_config_issues_rh_identity() {
    let file = write_config(".yaml", ENGINE_YAML);
    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.issuers.len(), 3);
    assert_eq!(config.cache.max_entries, Some(100));

    let observer = Arc::new(RecordingObserver::new());
    let service = build_service(
        &config,
        Arc::new(ManualClock::default()),
        observer.clone(),
    )
    .unwrap();

    let tokens = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [TokenType::rh_identity()]),
        )
        .await
        .unwrap();

    let token = &tokens[TokenType::RH_IDENTITY];
    assert!(token.never_expires());
    assert_eq!(
        decode_rh_identity(&token.value),
        json!({
            "identity": {
                "email": "alice@example.org",
                "org_id": "42",
                "entitlements": ["insights", "ansible"],
                "user": {"username": "alice"}
            }
        })
    );
    assert!(observer.last().unwrap().is_well_formed());
}

#[tokio::test]
async fn test_yaml_config_issues_transaction_token() {
    let file = write_config(".yml", ENGINE_YAML);
    let config = EngineConfig::load(file.path()).unwrap();
    let clock = Arc::new(ManualClock::default());
    let service = build_service(
        &config,
        clock.clone(),
        Arc::new(RecordingObserver::new()),
    )
    .unwrap();

    let mut attributes = RequestAttributes {
        method: Some("POST".into()),
        ..Default::default()
    };
    attributes
        .headers
        .insert("x-request-id".into(), "req-7".into());

    let tokens = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [TokenType::transaction_token()])
                .with_request_attributes(attributes),
        )
        .await
        .unwrap();

    let token = &tokens[TokenType::TRANSACTION_TOKEN];
    assert_eq!(token.expires_in(clock.now()), 60);
    assert!(token.value.ends_with('.'));
}

#[tokio::test]
async fn test_reserved_jwt_issuer_fails() {
    let file = write_config(".yaml", ENGINE_YAML);
    let config = EngineConfig::load(file.path()).unwrap();
    let service = build_service(
        &config,
        Arc::new(ManualClock::default()),
        Arc::new(RecordingObserver::new()),
    )
    .unwrap();

    let err = service
        .issue_tokens(
            &RequestContext::new(),
            IssueRequest::new(alice(), [TokenType::access_token()]),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not implemented"));
}

#[test]
fn test_toml_config_and_validation() {
    let file = write_config(
        ".toml",
        r#"
trust_domain = "example.org"

[[issuers]]
token_type = "urn:a"
type = "rh-identity"

[[issuers.mappers]]
type = "template"
datasources = ["missing"]
template = { sub = "{{subject.subject}}" }
"#,
    );

    let err = EngineConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("missing")));
}

#[test]
fn test_malformed_config_is_load_error() {
    let file = write_config(".json", r#"{"issuers": []}"#);
    assert!(matches!(
        EngineConfig::load(file.path()),
        Err(ConfigError::Load(_))
    ));
}
