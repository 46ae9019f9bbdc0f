//! Lifecycle error taxonomy
//!
//! Every error names the entity id(s) involved and the rule violated; remote
//! status codes never surface directly. `Timeout` and `Unavailable` are
//! retryable by the caller - the engine itself never retries.

use crate::client::GatewayError;
use crate::parser::ParseError;
use crate::versioning::VersioningError;

/// Error raised by the lifecycle manager and dependency orchestrator
#[derive(Debug, Clone, thiserror::Error)]
pub enum LifecycleError {
    /// Malformed or unsupported contract
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Invalid versioning parameters
    #[error("validation failed: {0}")]
    Validation(String),

    /// Version added with a scheme differing from its version set
    #[error("{0}")]
    SchemeConflict(String),

    /// Referenced resource does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Dependency-graph rule violated
    #[error("precondition failed: required {missing} '{id}' does not exist")]
    PreconditionFailed { missing: &'static str, id: String },

    /// Remote plane reports a naming collision idempotent upsert cannot resolve
    #[error("conflict on {entity} '{id}': {reason}")]
    Conflict {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Remote call timed out; retryable by the caller
    #[error("timeout while {action} {entity} '{id}'")]
    Timeout {
        action: &'static str,
        entity: &'static str,
        id: String,
    },

    /// Remote plane unreachable; retryable by the caller
    #[error("management plane unavailable while {action} {entity} '{id}': {reason}")]
    Unavailable {
        action: &'static str,
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Remote plane misbehaved (malformed response, unexpected status)
    #[error("management plane protocol error on {entity} '{id}': {reason}")]
    Protocol {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Caller not authorized for the attempted mutation
    #[error("unauthorized while {action} {entity} '{id}'")]
    Unauthorized {
        action: &'static str,
        entity: &'static str,
        id: String,
    },
}

impl From<VersioningError> for LifecycleError {
    fn from(e: VersioningError) -> Self {
        match e {
            VersioningError::Validation { .. } => LifecycleError::Validation(e.to_string()),
            VersioningError::SchemeConflict { .. } => LifecycleError::SchemeConflict(e.to_string()),
        }
    }
}

impl LifecycleError {
    /// Map a gateway error into the taxonomy, attaching entity context.
    pub fn from_gateway(
        error: GatewayError,
        action: &'static str,
        entity: &'static str,
        id: &str,
    ) -> Self {
        match error {
            GatewayError::NotFound(_) => LifecycleError::NotFound {
                entity,
                id: id.to_string(),
            },
            GatewayError::Conflict(reason) => LifecycleError::Conflict {
                entity,
                id: id.to_string(),
                reason,
            },
            GatewayError::Unauthorized(_) => LifecycleError::Unauthorized {
                action,
                entity,
                id: id.to_string(),
            },
            GatewayError::Timeout(_) => LifecycleError::Timeout {
                action,
                entity,
                id: id.to_string(),
            },
            GatewayError::Unavailable(reason) => LifecycleError::Unavailable {
                action,
                entity,
                id: id.to_string(),
                reason,
            },
            GatewayError::Protocol(reason) => LifecycleError::Protocol {
                entity,
                id: id.to_string(),
                reason,
            },
        }
    }

    /// Whether the caller may safely retry the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LifecycleError::Timeout { .. } | LifecycleError::Unavailable { .. }
        )
    }
}
