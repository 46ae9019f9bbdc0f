//! Product, subscription and backend models

use super::enums::{BackendProtocol, ProductState, SubscriptionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product grouping APIs for publication and subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: ProductState,
    pub subscription_required: bool,
    pub approval_required: bool,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied product definition for `ensure_product`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpec {
    pub product_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub subscription_required: bool,
    #[serde(default)]
    pub approval_required: bool,
}

fn default_true() -> bool {
    true
}

impl ProductSpec {
    pub fn new(product_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            display_name: display_name.into(),
            description: None,
            subscription_required: true,
            approval_required: false,
        }
    }
}

/// An opaque subscription key.
///
/// Keys are sensitive: `Debug` and `Display` are redacted so the value can
/// never reach logs through formatting. Callers access the cleartext via
/// [`SubscriptionKey::expose`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Return the cleartext key. Callers own its secure handling.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscriptionKey(<redacted>)")
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

/// A subscription scoped to one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    pub display_name: String,
    /// The product this subscription is scoped to
    pub product_id: String,
    pub state: SubscriptionState,
    pub primary_key: SubscriptionKey,
    pub secondary_key: SubscriptionKey,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied subscription definition for `ensure_subscription`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    pub subscription_id: String,
    pub display_name: String,
    pub product_id: String,
}

impl SubscriptionSpec {
    pub fn new(
        subscription_id: impl Into<String>,
        display_name: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            display_name: display_name.into(),
            product_id: product_id.into(),
        }
    }
}

/// TLS verification options for a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendTls {
    pub validate_certificate_chain: bool,
    pub validate_certificate_name: bool,
}

/// A backend service an API routes traffic to
///
/// Backends are independent entities; APIs reference them by `service_url`
/// or name, and deleting an API never cascades to its backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub name: String,
    pub url: String,
    pub protocol: BackendProtocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<BackendTls>,
}
