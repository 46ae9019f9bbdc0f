//! Parsed contract model
//!
//! A `ParsedContract` is the format-agnostic result of parsing an OpenAPI or
//! Protobuf document. It is produced once by the parser and consumed
//! read-only by the lifecycle manager.

use super::enums::{ParameterLocation, SourceFormat};
use serde::{Deserialize, Serialize};

/// A parameter carried by an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// One callable operation of an API contract
///
/// HTTP operations carry `method` + `url_template`; gRPC operations carry
/// `rpc_name` + `service_method_path`. The request/response message types of
/// an rpc are recorded for documentation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_method_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Operation {
    /// Identity key used to match operations across imports.
    ///
    /// HTTP operations are identified by `(method, url_template)`, gRPC
    /// operations by `rpc_name`. Re-importing the same contract matches and
    /// replaces operations by this key rather than appending duplicates.
    pub fn identity_key(&self) -> String {
        match (&self.rpc_name, &self.method, &self.url_template) {
            (Some(rpc), _, _) => format!("rpc:{}", rpc),
            (None, Some(method), Some(template)) => {
                format!("{}:{}", method.to_uppercase(), template)
            }
            // Degenerate contracts fall back to the operation name.
            _ => format!("name:{}", self.name),
        }
    }
}

/// Format-agnostic result of parsing an API contract
///
/// Immutable once produced. `warnings` records constructs the parser dropped
/// or could not resolve (cookie parameters, unresolved proto imports, ...);
/// they are informational and never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedContract {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source_format: SourceFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_service_url: Option<String>,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ParsedContract {
    /// Operations deduplicated by identity key, last occurrence winning.
    ///
    /// A well-formed contract has no duplicate keys; a malformed one (two
    /// declarations of the same path+method) converges to a single entry.
    pub fn deduplicated_operations(&self) -> Vec<Operation> {
        let mut seen = std::collections::HashMap::new();
        for op in &self.operations {
            seen.insert(op.identity_key(), op.clone());
        }
        let mut ops: Vec<Operation> = seen.into_values().collect();
        ops.sort_by(|a, b| a.name.cmp(&b.name));
        ops
    }
}
