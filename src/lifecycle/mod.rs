//! Resource lifecycle management
//!
//! The orchestrator for API, version set and revision resources. Given a
//! parsed contract plus identity/version inputs it performs existence checks
//! and issues create-or-update calls through the gateway client, with two
//! standing guarantees:
//!
//! - Idempotence: re-applying the same contract converges to the same
//!   resource state; operations are matched by identity key, never appended.
//! - Serialization: at most one in-flight lifecycle mutation per `api_id`,
//!   enforced by an identity-keyed lock arena held for the whole operation.
//!
//! Interrupted sequences (e.g. cancellation after API creation, before
//! operation import) leave a valid partially-imported state; re-invoking
//! `create_or_update_api` converges it.

pub mod error;
pub mod locks;

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::GatewayClient;
use crate::models::{
    ApiIdentity, ApiResource, ApiRevision, Operation, ParsedContract, Protocol, SourceFormat,
    VersionSet, VersioningScheme,
};
use crate::versioning::{self, VersionRouting};

pub use error::LifecycleError;
pub use locks::KeyedLocks;

/// Lifecycle manager over a gateway client
pub struct LifecycleManager {
    client: Arc<dyn GatewayClient>,
    locks: KeyedLocks,
}

impl LifecycleManager {
    pub fn new(client: Arc<dyn GatewayClient>) -> Self {
        Self {
            client,
            locks: KeyedLocks::new(),
        }
    }

    /// Create an API from a parsed contract, or converge an existing one.
    ///
    /// Create path: creates the version set (when `routing` is supplied),
    /// the API resource (path suffixed for `Segment` routing) and imports
    /// the contract's operations. Revision 1 is implicit and current by
    /// construction.
    ///
    /// Update path: re-applies the contract's metadata and operation set as
    /// an idempotent upsert - a pre-existing API is never an error.
    pub async fn create_or_update_api(
        &self,
        identity: &ApiIdentity,
        contract: &ParsedContract,
        routing: Option<&VersionRouting>,
    ) -> Result<ApiResource, LifecycleError> {
        let mutex = self.locks.get(&identity.api_id);
        let _guard = mutex.lock().await;

        let version_set_id = match routing {
            Some(routing) => Some(self.ensure_version_set(identity, routing).await?),
            None => None,
        };

        let existing = match self.client.get_api(&identity.api_id).await {
            Ok(api) => Some(api),
            Err(crate::client::GatewayError::NotFound(_)) => None,
            Err(e) => {
                return Err(LifecycleError::from_gateway(
                    e,
                    "reading",
                    "api",
                    &identity.api_id,
                ));
            }
        };
        let is_update = existing.is_some();

        let mut api = match existing {
            // Converge metadata onto the existing resource.
            Some(mut api) => {
                api.display_name = identity
                    .display_name
                    .clone()
                    .unwrap_or_else(|| contract.title.clone());
                api.description = contract.description.clone();
                api.service_url = contract.base_service_url.clone();
                api.protocols = protocols_for(contract.source_format);
                api.subscription_required = identity.subscription_required;
                api
            }
            None => ApiResource {
                api_id: identity.api_id.clone(),
                display_name: identity
                    .display_name
                    .clone()
                    .unwrap_or_else(|| contract.title.clone()),
                description: contract.description.clone(),
                path: identity.path.clone(),
                service_url: contract.base_service_url.clone(),
                protocols: protocols_for(contract.source_format),
                subscription_required: identity.subscription_required,
                version_set_id: None,
                api_version: None,
                versioning_scheme: None,
            },
        };
        if let Some(routing) = routing {
            api.path = routing.apply_to_path(&identity.path);
            api.version_set_id = version_set_id;
            api.api_version = Some(routing.version_id.clone());
            api.versioning_scheme = Some(routing.scheme);
        }

        let api = self
            .client
            .create_or_update_api(&api)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "upserting", "api", &identity.api_id))?;

        let operation_count = self.import_contract_operations(&api.api_id, contract).await?;

        info!(
            api_id = %api.api_id,
            path = %api.path,
            operations = operation_count,
            update = is_update,
            "api converged from contract"
        );
        Ok(api)
    }

    /// Create a new version of an existing logical API.
    ///
    /// The base API must exist and belong to a version set; the new version
    /// inherits the set's versioning scheme, and a mismatching `routing`
    /// scheme is a `SchemeConflict`. Operations are not copied from the
    /// prior version: without a contract the new version is created with
    /// zero operations, which is allowed and logged.
    pub async fn create_version(
        &self,
        base_api_id: &str,
        version_id: &str,
        routing: &VersionRouting,
        contract: Option<&ParsedContract>,
    ) -> Result<ApiResource, LifecycleError> {
        let new_api_id = format!("{}-{}", base_api_id, version_id);
        // Two resources are touched: the base is read, the derived version
        // is mutated. Hold both identity locks for the whole call, base
        // first then derived, so a concurrent upsert of the new version id
        // serializes behind this one.
        let base_mutex = self.locks.get(base_api_id);
        let _base_guard = base_mutex.lock().await;
        let version_mutex = self.locks.get(&new_api_id);
        let _version_guard = version_mutex.lock().await;

        let base = self
            .client
            .get_api(base_api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "reading", "api", base_api_id))?;

        let version_set_id = base.version_set_id.clone().ok_or(LifecycleError::NotFound {
            entity: "version set",
            id: VersionSet::id_for(base_api_id),
        })?;
        let set = self
            .client
            .get_version_set(&version_set_id)
            .await
            .map_err(|e| {
                LifecycleError::from_gateway(e, "reading", "version set", &version_set_id)
            })?;
        versioning::check_scheme(&set, routing)?;

        let api = ApiResource {
            api_id: new_api_id.clone(),
            display_name: base.display_name.clone(),
            description: contract.and_then(|c| c.description.clone()).or(base.description.clone()),
            path: routing.apply_to_path(&unversioned_path(&base)),
            service_url: contract
                .and_then(|c| c.base_service_url.clone())
                .or(base.service_url.clone()),
            protocols: contract
                .map(|c| protocols_for(c.source_format))
                .unwrap_or_else(|| base.protocols.clone()),
            subscription_required: base.subscription_required,
            version_set_id: Some(version_set_id),
            api_version: Some(version_id.to_string()),
            versioning_scheme: Some(set.versioning_scheme),
        };

        let api = self
            .client
            .create_or_update_api(&api)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "upserting", "api", &new_api_id))?;

        let operation_count = match contract {
            Some(contract) => self.import_contract_operations(&new_api_id, contract).await?,
            None => {
                warn!(
                    api_id = %new_api_id,
                    "version created without a contract: operation set is empty until one is imported"
                );
                0
            }
        };

        info!(
            api_id = %new_api_id,
            base_api_id,
            version_id,
            operations = operation_count,
            "api version created"
        );
        Ok(api)
    }

    /// Create the next revision of an API and make it current.
    ///
    /// The revision number increments monotonically; the previous current
    /// revision's flag flips off in the same state transition, so no caller
    /// ever observes zero or two current revisions.
    pub async fn create_revision(
        &self,
        api_id: &str,
        description: Option<&str>,
    ) -> Result<ApiRevision, LifecycleError> {
        let mutex = self.locks.get(api_id);
        let _guard = mutex.lock().await;

        // Existence check first so a missing API surfaces as NotFound on
        // the api, not on the revision call.
        self.client
            .get_api(api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "reading", "api", api_id))?;

        let revision = self
            .client
            .create_revision(api_id, description)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "creating revision of", "api", api_id))?;

        info!(
            api_id,
            revision = revision.revision_number,
            "revision created and made current"
        );
        Ok(revision)
    }

    /// Fetch an API resource.
    pub async fn get_api(&self, api_id: &str) -> Result<ApiResource, LifecycleError> {
        self.client
            .get_api(api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "reading", "api", api_id))
    }

    /// List every version of the logical API `base_api_id` belongs to.
    pub async fn list_versions(&self, base_api_id: &str) -> Result<Vec<ApiResource>, LifecycleError> {
        let base = self.get_api(base_api_id).await?;
        let Some(version_set_id) = base.version_set_id else {
            // An unversioned API is its own sole "version".
            return Ok(vec![base]);
        };
        self.client
            .list_apis_in_version_set(&version_set_id)
            .await
            .map_err(|e| {
                LifecycleError::from_gateway(e, "listing", "version set", &version_set_id)
            })
    }

    /// List all revisions of an API.
    pub async fn list_revisions(&self, api_id: &str) -> Result<Vec<ApiRevision>, LifecycleError> {
        self.client
            .list_revisions(api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing revisions of", "api", api_id))
    }

    /// List the current operation set of an API.
    pub async fn get_operations(&self, api_id: &str) -> Result<Vec<Operation>, LifecycleError> {
        self.client
            .list_operations(api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing operations of", "api", api_id))
    }

    /// Get or create the version set for a logical API identity.
    async fn ensure_version_set(
        &self,
        identity: &ApiIdentity,
        routing: &VersionRouting,
    ) -> Result<String, LifecycleError> {
        let version_set_id = VersionSet::id_for(&identity.api_id);
        match self.client.get_version_set(&version_set_id).await {
            Ok(set) => {
                versioning::check_scheme(&set, routing)?;
                Ok(version_set_id)
            }
            Err(crate::client::GatewayError::NotFound(_)) => {
                let set = VersionSet {
                    version_set_id: version_set_id.clone(),
                    display_name: identity
                        .display_name
                        .clone()
                        .unwrap_or_else(|| identity.api_id.clone()),
                    versioning_scheme: routing.scheme,
                    version_query_name: match routing.scheme {
                        VersioningScheme::Query => routing.discriminator_name.clone(),
                        _ => None,
                    },
                    version_header_name: match routing.scheme {
                        VersioningScheme::Header => routing.discriminator_name.clone(),
                        _ => None,
                    },
                };
                self.client.create_version_set(&set).await.map_err(|e| {
                    LifecycleError::from_gateway(e, "creating", "version set", &version_set_id)
                })?;
                debug!(version_set_id, scheme = %routing.scheme, "version set created");
                Ok(version_set_id)
            }
            Err(e) => Err(LifecycleError::from_gateway(
                e,
                "reading",
                "version set",
                &version_set_id,
            )),
        }
    }

    /// Import a contract's operations, matched by identity key.
    ///
    /// The desired set is the contract's operations deduplicated by
    /// `(method, url_template)` / `rpc_name`; operations present remotely
    /// but absent from the contract are dropped by the declarative import.
    async fn import_contract_operations(
        &self,
        api_id: &str,
        contract: &ParsedContract,
    ) -> Result<usize, LifecycleError> {
        let existing = self
            .client
            .list_operations(api_id)
            .await
            .map_err(|e| LifecycleError::from_gateway(e, "listing operations of", "api", api_id))?;
        let desired = contract.deduplicated_operations();

        let desired_keys: HashSet<String> =
            desired.iter().map(|op| op.identity_key()).collect();
        let replaced = existing
            .iter()
            .filter(|op| desired_keys.contains(&op.identity_key()))
            .count();
        let removed = existing.len() - replaced;

        self.client
            .import_operations(api_id, &desired)
            .await
            .map_err(|e| {
                LifecycleError::from_gateway(e, "importing operations of", "api", api_id)
            })?;

        if removed > 0 {
            debug!(api_id, removed, "stale operations dropped during import");
        }
        if desired.is_empty() {
            // Surface the zero-operation condition prominently: well-formed
            // contracts have been observed to import empty on some planes.
            warn!(api_id, "imported contract has 0 operations");
        }
        for warning in &contract.warnings {
            warn!(api_id, warning = %warning, "contract warning");
        }
        Ok(desired.len())
    }
}

/// Transport protocols implied by a contract's source format
fn protocols_for(format: SourceFormat) -> HashSet<Protocol> {
    match format {
        SourceFormat::OpenApi => HashSet::from([Protocol::Https]),
        SourceFormat::Protobuf => HashSet::from([Protocol::Grpc]),
    }
}

/// Recover the unversioned base path of an API.
///
/// Under `Segment` routing the stored path already carries the version
/// suffix ("weather/v1"); stripping it yields the path new versions are
/// suffixed onto. Other schemes leave the path untouched.
fn unversioned_path(api: &ApiResource) -> String {
    if let (Some(VersioningScheme::Segment), Some(version)) =
        (api.versioning_scheme, api.api_version.as_deref())
    {
        if let Some(stripped) = api.path.strip_suffix(&format!("/{}", version)) {
            return stripped.to_string();
        }
    }
    api.path.clone()
}
