//! Models module for the SDK
//!
//! Defines the core data structures for parsed contracts and gateway
//! resources. Contracts are produced by the parser; resource models are
//! created and converged by the lifecycle manager and orchestrator.

pub mod api;
pub mod contract;
pub mod enums;
pub mod product;

pub use api::{ApiIdentity, ApiResource, ApiRevision, VersionSet};
pub use contract::{Operation, Parameter, ParsedContract};
pub use enums::*;
pub use product::{
    Backend, BackendTls, Product, ProductSpec, Subscription, SubscriptionKey, SubscriptionSpec,
};
