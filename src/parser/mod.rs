//! Contract parsing
//!
//! Normalizes an API contract into a format-agnostic [`ParsedContract`]:
//! - OpenAPI 3.x (YAML or JSON text)
//! - Protobuf proto3 service definitions (text form)
//!
//! Parsing is pure: no I/O, no side effects. A syntactically valid contract
//! with zero operations is a valid result, not an error - callers decide
//! whether an empty operation set is acceptable.

pub mod openapi;
pub mod protobuf;

use crate::models::{ParsedContract, SourceFormat};

/// Error during contract parsing
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// Input is not valid syntax for the declared format
    #[error("{format} syntax error: {reason}")]
    Syntax { format: SourceFormat, reason: String },
    /// A required field is missing or malformed; the field is named
    #[error("invalid {format} contract: {field}: {reason}")]
    InvalidField {
        format: SourceFormat,
        field: String,
        reason: String,
    },
    /// The declared contract version is not supported
    #[error("unsupported {format} version '{version}': {reason}")]
    UnsupportedVersion {
        format: SourceFormat,
        version: String,
        reason: String,
    },
    /// An rpc references a message type that is never defined
    #[error("undefined message type '{message}' referenced by rpc '{rpc}'")]
    UndefinedMessage { rpc: String, message: String },
}

/// Parse a raw contract in the given format.
///
/// Dispatches to the format-specific parser. See [`openapi::OpenApiParser`]
/// and [`protobuf::ProtobufParser`] for format rules.
pub fn parse(raw: &str, format: SourceFormat) -> Result<ParsedContract, ParseError> {
    let contract = match format {
        SourceFormat::OpenApi => openapi::OpenApiParser::new().parse(raw)?,
        SourceFormat::Protobuf => protobuf::ProtobufParser::new().parse(raw)?,
    };
    tracing::info!(
        title = %contract.title,
        format = %contract.source_format,
        operations = contract.operations.len(),
        warnings = contract.warnings.len(),
        "parsed contract"
    );
    if contract.operations.is_empty() {
        // Zero operations is legal but almost always surprising; make it
        // visible so integrators can detect silent empty imports.
        tracing::warn!(title = %contract.title, "contract parsed with 0 operations");
    }
    Ok(contract)
}
