//! # Tokensmith - Token Issuance Engine
//!
//! Issues transaction, access and identity tokens on behalf of a trust
//! domain. Callers hand over an already-validated subject (and optional
//! actor) with request metadata; the engine decides the claims, enriches them
//! from named data sources and routes the claim set to the issuer registered
//! for each requested token type.
//!
//! ## Architecture
//!
//! - [`service`] - `TokenService::issue_tokens`, the entry point
//! - [`registry`] - Token type to issuer directory and key aggregation
//! - [`issuer`] - Issuer trait with stub, unsigned, rh-identity and JWT variants
//! - [`mapper`] - Claim mapper pipeline (template, passthrough, request attributes, stub)
//! - [`datasource`] - Named enrichment lookups with transparent TTL caching
//! - [`observer`] - Per-request observer/probe lifecycle and its state machine
//! - [`config`] / [`factory`] - Declarative configuration and service assembly
//! - [`clock`] / [`context`] - Injected time and request cancellation
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tokensmith::clock::ManualClock;
//! use tokensmith::issuer::RhIdentityIssuer;
//! use tokensmith::mapper::{MapperPipeline, PassthroughMapper};
//! use tokensmith::observer::RecordingObserver;
//! use tokensmith::{IssueRequest, RequestContext, TokenService, TokenType, TrustResult};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let clock = Arc::new(ManualClock::default());
//! let observer = Arc::new(RecordingObserver::new());
//! let service = TokenService::builder("example.org")
//!     .observer(observer.clone())
//!     .build();
//! service.registry().register(
//!     TokenType::rh_identity(),
//!     Arc::new(RhIdentityIssuer::new(
//!         MapperPipeline::default().with(Arc::new(PassthroughMapper)),
//!         clock,
//!     )),
//! );
//!
//! let subject = TrustResult::new("alice", "example.org").with_claim("org_id", "42");
//! let tokens = service
//!     .issue_tokens(
//!         &RequestContext::new(),
//!         IssueRequest::new(subject, [TokenType::rh_identity()]),
//!     )
//!     .await
//!     .unwrap();
//!
//! assert!(tokens[TokenType::RH_IDENTITY].never_expires());
//! assert!(observer.last().unwrap().is_well_formed());
//! # }
//! ```

pub mod claims;
pub mod clock;
pub mod config;
pub mod context;
pub mod datasource;
pub mod error;
pub mod factory;
pub mod issuer;
pub mod mapper;
pub mod observer;
pub mod registry;
pub mod service;
pub mod template;
pub mod token;
pub mod types;

#[doc(inline)]
pub use claims::Claims;
#[doc(inline)]
pub use clock::{Clock, ManualClock, SystemClock};
#[doc(inline)]
pub use config::EngineConfig;
#[doc(inline)]
pub use context::{Interrupted, RequestContext};
#[doc(inline)]
pub use error::{
    ConfigError, DataSourceError, IssuerError, KeyRetrievalError, MapperError, RegistryError,
    TokenServiceError, TokenServiceResult,
};
#[doc(inline)]
pub use factory::build_service;
#[doc(inline)]
pub use observer::{Observer, Probe};
#[doc(inline)]
pub use registry::IssuerRegistry;
#[doc(inline)]
pub use service::{TokenService, TokenServiceBuilder};
#[doc(inline)]
pub use token::{Token, TokenType};
#[doc(inline)]
pub use types::{IssueContext, IssueRequest, RequestAttributes, TrustResult};
