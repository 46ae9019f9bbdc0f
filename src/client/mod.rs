//! Gateway client abstraction
//!
//! Defines the `GatewayClient` trait - the single seam through which the
//! lifecycle manager and dependency orchestrator talk to the remote
//! management plane - and its implementations:
//! - HttpGatewayClient: HTTP management API (feature `http-client`, default)
//! - InMemoryGatewayClient: mutex-guarded in-process plane for tests and
//!   dry runs

use async_trait::async_trait;

use crate::models::{
    ApiResource, ApiRevision, Backend, Operation, Product, Subscription, SubscriptionSpec,
    VersionSet,
};

/// Error type for gateway plane operations
///
/// Transport detail stays here; the lifecycle layer maps these into its own
/// taxonomy with entity context before they reach callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("naming collision: {0}")]
    Conflict(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("management plane unavailable: {0}")]
    Unavailable(String),
    #[error("remote call timed out: {0}")]
    Timeout(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Trait for gateway management-plane clients
///
/// All calls are blocking from the orchestration layer's point of view;
/// running independent workflows concurrently is the embedding server's
/// responsibility. Implementations carry a caller-supplied timeout per
/// remote call and never retry internally.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    // --- APIs ---

    async fn get_api(&self, api_id: &str) -> Result<ApiResource, GatewayError>;

    /// Create-if-absent, converge-if-present. Never errors solely because
    /// the API already exists.
    async fn create_or_update_api(&self, api: &ApiResource) -> Result<ApiResource, GatewayError>;

    async fn list_apis_in_version_set(
        &self,
        version_set_id: &str,
    ) -> Result<Vec<ApiResource>, GatewayError>;

    // --- Operations ---

    async fn list_operations(&self, api_id: &str) -> Result<Vec<Operation>, GatewayError>;

    /// Replace the API's operation set with `operations`.
    ///
    /// The caller has already matched operations by identity key; the plane
    /// treats this as a declarative import, not an append.
    async fn import_operations(
        &self,
        api_id: &str,
        operations: &[Operation],
    ) -> Result<(), GatewayError>;

    // --- Version sets ---

    async fn get_version_set(&self, version_set_id: &str) -> Result<VersionSet, GatewayError>;

    async fn create_version_set(&self, set: &VersionSet) -> Result<VersionSet, GatewayError>;

    // --- Revisions ---

    /// Create the next revision of an API and make it current.
    ///
    /// The revision number is assigned monotonically by the plane, and the
    /// current-flag flip is a single state transition: no observable state
    /// has zero or two current revisions.
    async fn create_revision(
        &self,
        api_id: &str,
        description: Option<&str>,
    ) -> Result<ApiRevision, GatewayError>;

    async fn list_revisions(&self, api_id: &str) -> Result<Vec<ApiRevision>, GatewayError>;

    // --- Products ---

    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError>;

    async fn create_or_update_product(&self, product: &Product) -> Result<Product, GatewayError>;

    async fn list_products(&self) -> Result<Vec<Product>, GatewayError>;

    /// Associate an API to a product. Re-associating an already associated
    /// pair is a no-op success.
    async fn associate_api_to_product(
        &self,
        product_id: &str,
        api_id: &str,
    ) -> Result<(), GatewayError>;

    async fn list_api_products(&self, api_id: &str) -> Result<Vec<Product>, GatewayError>;

    // --- Subscriptions ---

    /// Create a subscription; the plane generates the key pair.
    async fn create_subscription(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<Subscription, GatewayError>;

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, GatewayError>;

    // --- Backends ---

    async fn list_backends(&self) -> Result<Vec<Backend>, GatewayError>;
}

// Client implementations
#[cfg(feature = "http-client")]
pub mod http;

pub mod memory;
