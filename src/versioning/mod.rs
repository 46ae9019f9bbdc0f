//! Version strategy resolution
//!
//! Computes the concrete routing discriminator for an API version under a
//! [`VersioningScheme`] and validates scheme-specific parameters. All
//! versions of one logical API must resolve with the same scheme; a
//! mismatching scheme on a later version is a conflict, never an overwrite.

use crate::models::{VersionSet, VersioningScheme};

/// Default query parameter name for `Query` versioning
pub const DEFAULT_QUERY_NAME: &str = "version";
/// Default header name for `Header` versioning
pub const DEFAULT_HEADER_NAME: &str = "Api-Version";

/// Header names that cannot be repurposed as version discriminators
const RESERVED_HEADERS: [&str; 4] = ["host", "content-type", "content-length", "authorization"];

/// Error during version strategy resolution
#[derive(Debug, Clone, thiserror::Error)]
pub enum VersioningError {
    /// A versioning parameter is invalid; the field is named
    #[error("invalid versioning parameter {field}: {reason}")]
    Validation { field: String, reason: String },
    /// The requested scheme differs from the version set's scheme
    #[error(
        "versioning scheme conflict on version set '{version_set_id}': set uses {existing}, request asked for {requested}"
    )]
    SchemeConflict {
        version_set_id: String,
        existing: VersioningScheme,
        requested: VersioningScheme,
    },
}

/// Concrete routing discriminator for one API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRouting {
    pub scheme: VersioningScheme,
    pub version_id: String,
    /// Query parameter or header name carrying the version; `None` for
    /// `Segment`, where the version is encoded into the path instead.
    pub discriminator_name: Option<String>,
}

impl VersionRouting {
    /// Append the version segment to a base path for `Segment` routing.
    ///
    /// `Query` and `Header` leave the base path unchanged.
    pub fn apply_to_path(&self, base_path: &str) -> String {
        match self.scheme {
            VersioningScheme::Segment => {
                format!("{}/{}", base_path.trim_end_matches('/'), self.version_id)
            }
            VersioningScheme::Query | VersioningScheme::Header => base_path.to_string(),
        }
    }
}

/// Resolve a versioning scheme selection into a concrete [`VersionRouting`].
///
/// Defaults: query name `"version"`, header name `"Api-Version"`. `Segment`
/// takes no discriminator name; a supplied one is ignored with a warning.
pub fn resolve(
    scheme: VersioningScheme,
    version_id: &str,
    query_name: Option<&str>,
    header_name: Option<&str>,
) -> Result<VersionRouting, VersioningError> {
    if version_id.trim().is_empty() {
        return Err(VersioningError::Validation {
            field: "version_id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let discriminator_name = match scheme {
        VersioningScheme::Segment => {
            if query_name.is_some() || header_name.is_some() {
                tracing::warn!(
                    version_id,
                    "segment versioning takes no discriminator name; ignoring supplied name"
                );
            }
            None
        }
        VersioningScheme::Query => {
            let name = query_name.unwrap_or(DEFAULT_QUERY_NAME);
            validate_query_name(name)?;
            Some(name.to_string())
        }
        VersioningScheme::Header => {
            let name = header_name.unwrap_or(DEFAULT_HEADER_NAME);
            validate_header_name(name)?;
            Some(name.to_string())
        }
    };

    Ok(VersionRouting {
        scheme,
        version_id: version_id.to_string(),
        discriminator_name,
    })
}

/// Check a routing request against the version set it would join.
///
/// All members of a version set share one scheme; a mismatch is a
/// [`VersioningError::SchemeConflict`].
pub fn check_scheme(set: &VersionSet, routing: &VersionRouting) -> Result<(), VersioningError> {
    if set.versioning_scheme != routing.scheme {
        return Err(VersioningError::SchemeConflict {
            version_set_id: set.version_set_id.clone(),
            existing: set.versioning_scheme,
            requested: routing.scheme,
        });
    }
    Ok(())
}

fn validate_query_name(name: &str) -> Result<(), VersioningError> {
    if name.trim().is_empty() {
        return Err(VersioningError::Validation {
            field: "query_name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if name.contains('=') || name.contains('&') || name.contains(' ') {
        return Err(VersioningError::Validation {
            field: "query_name".to_string(),
            reason: format!("'{}' contains reserved query characters", name),
        });
    }
    Ok(())
}

fn validate_header_name(name: &str) -> Result<(), VersioningError> {
    if name.trim().is_empty() {
        return Err(VersioningError::Validation {
            field: "header_name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if RESERVED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(VersioningError::Validation {
            field: "header_name".to_string(),
            reason: format!("'{}' is a reserved header", name),
        });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(VersioningError::Validation {
            field: "header_name".to_string(),
            reason: format!("'{}' is not a valid header name", name),
        });
    }
    Ok(())
}
