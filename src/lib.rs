//! Gateway Lifecycle SDK - contract import and resource lifecycle engine
//!
//! Provides the control-plane core a gateway-management server needs to turn
//! an API contract into a consistent, idempotent set of gateway resources:
//! - Contract parsing (OpenAPI 3.x YAML/JSON, proto3 service definitions)
//! - Version strategy resolution (path segment, query parameter, header)
//! - API / version set / revision lifecycle with per-identity serialization
//! - Product, subscription and backend dependency orchestration
//!
//! The remote management plane is reached through the `GatewayClient` trait;
//! an HTTP implementation ships behind the default `http-client` feature and
//! an in-memory plane backs tests and dry runs.

pub mod client;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod versioning;

// Re-export commonly used types
pub use client::{GatewayClient, GatewayError};
#[cfg(feature = "http-client")]
pub use client::http::HttpGatewayClient;
pub use client::memory::InMemoryGatewayClient;

pub use lifecycle::{LifecycleError, LifecycleManager};
pub use orchestrator::DependencyOrchestrator;
pub use parser::{ParseError, openapi::OpenApiParser, protobuf::ProtobufParser};
pub use versioning::{VersionRouting, VersioningError, resolve};

// Re-export models
pub use models::{
    ApiIdentity, ApiResource, ApiRevision, Backend, Operation, Parameter, ParsedContract,
    Product, ProductSpec, Subscription, SubscriptionKey, SubscriptionSpec, VersionSet,
};
pub use models::enums::*;
