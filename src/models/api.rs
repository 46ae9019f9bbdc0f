//! API, version set and revision models

use super::enums::{Protocol, VersioningScheme};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Caller-supplied identity for a logical API
///
/// `api_id` names the resource on the management plane; `path` is the base
/// routing path the API is exposed under (no leading or trailing slash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIdentity {
    pub api_id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_true")]
    pub subscription_required: bool,
}

fn default_true() -> bool {
    true
}

impl ApiIdentity {
    pub fn new(api_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            api_id: api_id.into(),
            path: path.into(),
            display_name: None,
            subscription_required: true,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// An API resource on the management plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub api_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    pub protocols: HashSet<Protocol>,
    pub subscription_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_set_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning_scheme: Option<VersioningScheme>,
}

/// Groups all versions of one logical API identity
///
/// Invariant: every member of a version set routes with the same
/// `versioning_scheme`; a mismatching later version is rejected, never
/// silently overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSet {
    pub version_set_id: String,
    pub display_name: String,
    pub versioning_scheme: VersioningScheme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_query_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_header_name: Option<String>,
}

impl VersionSet {
    /// Deterministic version set id for a logical API identity.
    ///
    /// Every version of the same base API derives the same id, so repeated
    /// imports converge on one set instead of minting duplicates.
    pub fn id_for(base_api_id: &str) -> String {
        format!("{}-versions", base_api_id)
    }
}

/// An internal, non-version-facing snapshot of one API's configuration
///
/// Invariant: exactly one revision per `api_id` has `is_current = true` at
/// any time; the flip is a single state transition at the plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRevision {
    pub api_id: String,
    pub revision_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_set_id_is_deterministic() {
        assert_eq!(VersionSet::id_for("weather-api"), "weather-api-versions");
        assert_eq!(VersionSet::id_for("weather-api"), VersionSet::id_for("weather-api"));
    }

    #[test]
    fn test_identity_builder() {
        let identity = ApiIdentity::new("weather-api", "weather").with_display_name("Weather");
        assert_eq!(identity.api_id, "weather-api");
        assert_eq!(identity.display_name.as_deref(), Some("Weather"));
        assert!(identity.subscription_required);
    }
}
