//! In-memory gateway client
//!
//! A complete, mutex-guarded in-process management plane. Used by the
//! integration tests and for dry-running an import sequence without a
//! remote plane. State transitions that the trait requires to be atomic
//! (the revision current-flag flip) happen under one lock acquisition.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    ApiResource, ApiRevision, Backend, Operation, Product, Subscription, SubscriptionKey,
    SubscriptionSpec, SubscriptionState, VersionSet,
};

use super::{GatewayClient, GatewayError};

#[derive(Debug, Default)]
struct PlaneState {
    apis: HashMap<String, ApiResource>,
    operations: HashMap<String, Vec<Operation>>,
    version_sets: HashMap<String, VersionSet>,
    revisions: HashMap<String, Vec<ApiRevision>>,
    products: HashMap<String, Product>,
    // (product_id, api_id) pairs
    associations: HashSet<(String, String)>,
    subscriptions: HashMap<String, Subscription>,
    backends: Vec<Backend>,
}

/// In-memory management plane
#[derive(Debug, Default)]
pub struct InMemoryGatewayClient {
    state: Mutex<PlaneState>,
}

impl InMemoryGatewayClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a backend, e.g. for `list_backends` tests.
    pub fn add_backend(&self, backend: Backend) {
        self.state.lock().expect("plane lock").backends.push(backend);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlaneState> {
        // A poisoned lock means a panic mid-mutation; propagating the panic
        // is the only sound option for a test double.
        self.state.lock().expect("plane lock poisoned")
    }
}

#[async_trait]
impl GatewayClient for InMemoryGatewayClient {
    async fn get_api(&self, api_id: &str) -> Result<ApiResource, GatewayError> {
        self.lock()
            .apis
            .get(api_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("api '{}'", api_id)))
    }

    async fn create_or_update_api(&self, api: &ApiResource) -> Result<ApiResource, GatewayError> {
        let mut state = self.lock();
        let is_new = !state.apis.contains_key(&api.api_id);
        state.apis.insert(api.api_id.clone(), api.clone());
        if is_new {
            // Revision 1 is implicit and current by construction.
            state.revisions.insert(
                api.api_id.clone(),
                vec![ApiRevision {
                    api_id: api.api_id.clone(),
                    revision_number: 1,
                    description: None,
                    is_current: true,
                    created_at: Utc::now(),
                }],
            );
            state.operations.entry(api.api_id.clone()).or_default();
        }
        Ok(api.clone())
    }

    async fn list_apis_in_version_set(
        &self,
        version_set_id: &str,
    ) -> Result<Vec<ApiResource>, GatewayError> {
        let state = self.lock();
        let mut apis: Vec<ApiResource> = state
            .apis
            .values()
            .filter(|api| api.version_set_id.as_deref() == Some(version_set_id))
            .cloned()
            .collect();
        apis.sort_by(|a, b| a.api_id.cmp(&b.api_id));
        Ok(apis)
    }

    async fn list_operations(&self, api_id: &str) -> Result<Vec<Operation>, GatewayError> {
        let state = self.lock();
        if !state.apis.contains_key(api_id) {
            return Err(GatewayError::NotFound(format!("api '{}'", api_id)));
        }
        Ok(state.operations.get(api_id).cloned().unwrap_or_default())
    }

    async fn import_operations(
        &self,
        api_id: &str,
        operations: &[Operation],
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if !state.apis.contains_key(api_id) {
            return Err(GatewayError::NotFound(format!("api '{}'", api_id)));
        }
        state.operations.insert(api_id.to_string(), operations.to_vec());
        Ok(())
    }

    async fn get_version_set(&self, version_set_id: &str) -> Result<VersionSet, GatewayError> {
        self.lock()
            .version_sets
            .get(version_set_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("version set '{}'", version_set_id)))
    }

    async fn create_version_set(&self, set: &VersionSet) -> Result<VersionSet, GatewayError> {
        let mut state = self.lock();
        state
            .version_sets
            .insert(set.version_set_id.clone(), set.clone());
        Ok(set.clone())
    }

    async fn create_revision(
        &self,
        api_id: &str,
        description: Option<&str>,
    ) -> Result<ApiRevision, GatewayError> {
        let mut state = self.lock();
        if !state.apis.contains_key(api_id) {
            return Err(GatewayError::NotFound(format!("api '{}'", api_id)));
        }
        let revisions = state.revisions.entry(api_id.to_string()).or_default();
        let next_number = revisions
            .iter()
            .map(|r| r.revision_number)
            .max()
            .unwrap_or(0)
            + 1;
        // Flip-or-nothing: clear the old current flag and set the new one
        // inside the same lock acquisition.
        for revision in revisions.iter_mut() {
            revision.is_current = false;
        }
        let revision = ApiRevision {
            api_id: api_id.to_string(),
            revision_number: next_number,
            description: description.map(|s| s.to_string()),
            is_current: true,
            created_at: Utc::now(),
        };
        revisions.push(revision.clone());
        Ok(revision)
    }

    async fn list_revisions(&self, api_id: &str) -> Result<Vec<ApiRevision>, GatewayError> {
        let state = self.lock();
        if !state.apis.contains_key(api_id) {
            return Err(GatewayError::NotFound(format!("api '{}'", api_id)));
        }
        Ok(state.revisions.get(api_id).cloned().unwrap_or_default())
    }

    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError> {
        self.lock()
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("product '{}'", product_id)))
    }

    async fn create_or_update_product(&self, product: &Product) -> Result<Product, GatewayError> {
        let mut state = self.lock();
        state
            .products
            .insert(product.product_id.clone(), product.clone());
        Ok(product.clone())
    }

    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        let state = self.lock();
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(products)
    }

    async fn associate_api_to_product(
        &self,
        product_id: &str,
        api_id: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if !state.products.contains_key(product_id) {
            return Err(GatewayError::NotFound(format!("product '{}'", product_id)));
        }
        if !state.apis.contains_key(api_id) {
            return Err(GatewayError::NotFound(format!("api '{}'", api_id)));
        }
        // HashSet insert makes re-association a natural no-op.
        state
            .associations
            .insert((product_id.to_string(), api_id.to_string()));
        Ok(())
    }

    async fn list_api_products(&self, api_id: &str) -> Result<Vec<Product>, GatewayError> {
        let state = self.lock();
        if !state.apis.contains_key(api_id) {
            return Err(GatewayError::NotFound(format!("api '{}'", api_id)));
        }
        let mut products: Vec<Product> = state
            .associations
            .iter()
            .filter(|(_, a)| a.as_str() == api_id)
            .filter_map(|(p, _)| state.products.get(p).cloned())
            .collect();
        products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(products)
    }

    async fn create_subscription(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<Subscription, GatewayError> {
        let mut state = self.lock();
        if !state.products.contains_key(&spec.product_id) {
            return Err(GatewayError::NotFound(format!(
                "product '{}'",
                spec.product_id
            )));
        }
        if let Some(existing) = state.subscriptions.get(&spec.subscription_id) {
            // Idempotent re-creation returns the existing subscription and
            // keeps the already-issued keys.
            return Ok(existing.clone());
        }
        let subscription = Subscription {
            subscription_id: spec.subscription_id.clone(),
            display_name: spec.display_name.clone(),
            product_id: spec.product_id.clone(),
            state: SubscriptionState::Active,
            primary_key: SubscriptionKey::new(Uuid::new_v4().simple().to_string()),
            secondary_key: SubscriptionKey::new(Uuid::new_v4().simple().to_string()),
            created_at: Utc::now(),
        };
        state
            .subscriptions
            .insert(spec.subscription_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, GatewayError> {
        let state = self.lock();
        let mut subscriptions: Vec<Subscription> =
            state.subscriptions.values().cloned().collect();
        subscriptions.sort_by(|a, b| a.subscription_id.cmp(&b.subscription_id));
        Ok(subscriptions)
    }

    async fn list_backends(&self) -> Result<Vec<Backend>, GatewayError> {
        Ok(self.lock().backends.clone())
    }
}
