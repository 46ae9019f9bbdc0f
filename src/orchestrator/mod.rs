//! Dependency orchestration
//!
//! Manages the API <-> Product <-> Subscription <-> Backend relationship
//! graph: verifies preconditions (the API must exist before a product is
//! associated to it, the product before a subscription is minted) and
//! performs the association writes. Association writes serialize on the
//! specific `(product_id, api_id)` pair they touch; unrelated pairs and
//! per-`api_id` lifecycle mutations proceed concurrently.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::{GatewayClient, GatewayError};
use crate::lifecycle::locks::KeyedLocks;
use crate::lifecycle::LifecycleError;
use crate::models::{
    Backend, Product, ProductSpec, ProductState, Subscription, SubscriptionSpec,
};

/// Orchestrator for product, subscription and backend associations
pub struct DependencyOrchestrator {
    client: Arc<dyn GatewayClient>,
    locks: KeyedLocks,
}

impl DependencyOrchestrator {
    pub fn new(client: Arc<dyn GatewayClient>) -> Self {
        Self {
            client,
            locks: KeyedLocks::new(),
        }
    }

    /// Get-or-create a product by id.
    ///
    /// If the product already exists it is converged in place to the
    /// supplied definition; prior existence is never an error. A freshly
    /// created product starts in `NotPublished` - publication is a
    /// caller-driven transition, see [`publish_product`](Self::publish_product).
    pub async fn ensure_product(&self, spec: &ProductSpec) -> Result<Product, LifecycleError> {
        let mutex = self.locks.get(&spec.product_id);
        let _guard = mutex.lock().await;

        let (state, created_at, is_new) = match self.client.get_product(&spec.product_id).await {
            // Keep the existing publication state; the upsert only
            // re-applies caller-supplied metadata.
            Ok(existing) => (existing.state, existing.created_at, false),
            Err(GatewayError::NotFound(_)) => (ProductState::NotPublished, Utc::now(), true),
            Err(e) => {
                return Err(LifecycleError::from_gateway(
                    e,
                    "reading",
                    "product",
                    &spec.product_id,
                ));
            }
        };

        let product = Product {
            product_id: spec.product_id.clone(),
            display_name: spec.display_name.clone(),
            description: spec.description.clone(),
            state,
            subscription_required: spec.subscription_required,
            approval_required: spec.approval_required,
            created_at,
        };
        let product = self
            .client
            .create_or_update_product(&product)
            .await
            .map_err(|e| {
                LifecycleError::from_gateway(e, "upserting", "product", &spec.product_id)
            })?;

        info!(product_id = %product.product_id, new = is_new, "product converged");
        Ok(product)
    }

    /// Transition a product to `Published`. Idempotent.
    pub async fn publish_product(&self, product_id: &str) -> Result<Product, LifecycleError> {
        let mutex = self.locks.get(product_id);
        let _guard = mutex.lock().await;

        let mut product = self
            .client
            .get_product(product_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "reading", "product", product_id))?;
        if product.state == ProductState::Published {
            return Ok(product);
        }
        product.state = ProductState::Published;
        let product = self
            .client
            .create_or_update_product(&product)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "publishing", "product", product_id))?;
        info!(product_id, "product published");
        Ok(product)
    }

    /// Associate an API to a product.
    ///
    /// Both sides must already exist; a missing one fails with
    /// `PreconditionFailed` naming which side is absent. An already
    /// existing association is a no-op success, not an error.
    pub async fn associate_api(
        &self,
        product_id: &str,
        api_id: &str,
    ) -> Result<(), LifecycleError> {
        let mutex = self.locks.get(&KeyedLocks::pair_key(product_id, api_id));
        let _guard = mutex.lock().await;

        if let Err(e) = self.client.get_product(product_id).await {
            return Err(match e {
                GatewayError::NotFound(_) => LifecycleError::PreconditionFailed {
                    missing: "product",
                    id: product_id.to_string(),
                },
                other => LifecycleError::from_gateway(other, "reading", "product", product_id),
            });
        }
        if let Err(e) = self.client.get_api(api_id).await {
            return Err(match e {
                GatewayError::NotFound(_) => LifecycleError::PreconditionFailed {
                    missing: "api",
                    id: api_id.to_string(),
                },
                other => LifecycleError::from_gateway(other, "reading", "api", api_id),
            });
        }

        match self.client.associate_api_to_product(product_id, api_id).await {
            Ok(()) => {
                info!(product_id, api_id, "api associated to product");
                Ok(())
            }
            // Planes that report an existing association as a collision are
            // normalized to the documented no-op success.
            Err(GatewayError::Conflict(_)) => {
                debug!(product_id, api_id, "association already exists");
                Ok(())
            }
            Err(e) => Err(LifecycleError::from_gateway(
                e,
                "associating",
                "product",
                product_id,
            )),
        }
    }

    /// Create a subscription scoped to a product.
    ///
    /// The referenced product must exist (`PreconditionFailed` otherwise).
    /// The returned key pair is opaque and sensitive: its `Debug` output is
    /// redacted and this engine never logs the cleartext values.
    pub async fn ensure_subscription(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<Subscription, LifecycleError> {
        let mutex = self.locks.get(&spec.subscription_id);
        let _guard = mutex.lock().await;

        if let Err(e) = self.client.get_product(&spec.product_id).await {
            return Err(match e {
                GatewayError::NotFound(_) => LifecycleError::PreconditionFailed {
                    missing: "product",
                    id: spec.product_id.clone(),
                },
                other => {
                    LifecycleError::from_gateway(other, "reading", "product", &spec.product_id)
                }
            });
        }

        let subscription = self.client.create_subscription(spec).await.map_err(|e| {
            LifecycleError::from_gateway(e, "creating", "subscription", &spec.subscription_id)
        })?;

        // Intentionally logs ids only, never the generated keys.
        info!(
            subscription_id = %subscription.subscription_id,
            product_id = %subscription.product_id,
            "subscription ensured"
        );
        Ok(subscription)
    }

    /// List products an API is associated to.
    pub async fn api_products(&self, api_id: &str) -> Result<Vec<Product>, LifecycleError> {
        self.client
            .list_api_products(api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing products of", "api", api_id))
    }

    /// List all products.
    pub async fn products(&self) -> Result<Vec<Product>, LifecycleError> {
        self.client
            .list_products()
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing", "product", "*"))
    }

    /// List all subscriptions.
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>, LifecycleError> {
        self.client
            .list_subscriptions()
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing", "subscription", "*"))
    }

    /// List registered backends.
    pub async fn backends(&self) -> Result<Vec<Backend>, LifecycleError> {
        self.client
            .list_backends()
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing", "backend", "*"))
    }
}
