//! OpenAPI contract parser
//!
//! Parses OpenAPI 3.x YAML or JSON into a [`ParsedContract`]. Each
//! path+method pair becomes one [`Operation`]; path-level parameters are
//! inherited by every method under that path unless overridden by name.
//! Constructs the model does not carry (cookie parameters, webhooks,
//! unresolved `$ref`s) are dropped with a recorded warning.

use crate::models::{Operation, Parameter, ParameterLocation, ParsedContract, SourceFormat};

use super::ParseError;

const HTTP_METHODS: [&str; 8] = [
    "get", "post", "put", "delete", "patch", "options", "head", "trace",
];

/// OpenAPI 3.x parser
///
/// Accumulates warnings while walking the document; the warnings end up on
/// the returned contract.
#[derive(Debug, Default)]
pub struct OpenApiParser {
    warnings: Vec<String>,
}

impl OpenApiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse OpenAPI YAML or JSON content into a `ParsedContract`.
    ///
    /// JSON is tried first (stricter); anything that is not valid JSON is
    /// parsed as YAML. Requires an `openapi: 3.x` declaration, `info.title`
    /// and a `paths` object. `paths: {}` is valid and yields an empty
    /// operation list.
    pub fn parse(mut self, content: &str) -> Result<ParsedContract, ParseError> {
        let spec = self.parse_document(content)?;
        let obj = spec.as_object().ok_or_else(|| ParseError::Syntax {
            format: SourceFormat::OpenApi,
            reason: "document root must be an object".to_string(),
        })?;

        let version = obj
            .get("openapi")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::InvalidField {
                format: SourceFormat::OpenApi,
                field: "openapi".to_string(),
                reason: "missing required version declaration".to_string(),
            })?;
        if !version.starts_with("3.") {
            return Err(ParseError::UnsupportedVersion {
                format: SourceFormat::OpenApi,
                version: version.to_string(),
                reason: "only OpenAPI 3.x is supported".to_string(),
            });
        }

        let info = obj
            .get("info")
            .and_then(|v| v.as_object())
            .ok_or_else(|| ParseError::InvalidField {
                format: SourceFormat::OpenApi,
                field: "info".to_string(),
                reason: "missing required object".to_string(),
            })?;
        let title = info
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::InvalidField {
                format: SourceFormat::OpenApi,
                field: "info.title".to_string(),
                reason: "missing required field".to_string(),
            })?
            .to_string();
        let description = info
            .get("description")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let base_service_url = obj
            .get("servers")
            .and_then(|v| v.as_array())
            .and_then(|servers| servers.first())
            .and_then(|s| s.get("url"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let paths = obj
            .get("paths")
            .and_then(|v| v.as_object())
            .ok_or_else(|| ParseError::InvalidField {
                format: SourceFormat::OpenApi,
                field: "paths".to_string(),
                reason: "missing required object".to_string(),
            })?;

        if obj.contains_key("webhooks") {
            self.warnings
                .push("webhooks are not modelled and were dropped".to_string());
        }

        let mut operations = Vec::new();
        for (path, path_item) in paths {
            let Some(item) = path_item.as_object() else {
                self.warnings
                    .push(format!("path item '{}' is not an object, skipped", path));
                continue;
            };

            // Path-level parameters apply to every method under this path.
            let inherited = self.collect_parameters(path, item.get("parameters"));

            for method in HTTP_METHODS {
                let Some(op) = item.get(method) else { continue };
                let Some(op_obj) = op.as_object() else {
                    self.warnings
                        .push(format!("operation '{} {}' is not an object, skipped", method, path));
                    continue;
                };

                let own = self.collect_parameters(path, op_obj.get("parameters"));
                let mut parameters = own;
                // Inherit path-level parameters unless overridden by name.
                for param in &inherited {
                    if !parameters.iter().any(|p| p.name == param.name) {
                        parameters.push(param.clone());
                    }
                }
                if op_obj.contains_key("requestBody") {
                    parameters.push(Parameter {
                        name: "body".to_string(),
                        location: ParameterLocation::Body,
                        required: op_obj
                            .get("requestBody")
                            .and_then(|b| b.get("required"))
                            .and_then(|v| v.as_bool())
                            .unwrap_or(false),
                        data_type: None,
                        example: None,
                    });
                }

                let name = op_obj
                    .get("operationId")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| derive_operation_name(method, path));
                let display_name = op_obj
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| name.clone());

                operations.push(Operation {
                    name,
                    display_name,
                    method: Some(method.to_uppercase()),
                    url_template: Some(path.clone()),
                    rpc_name: None,
                    service_method_path: None,
                    description: op_obj
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    request_type: None,
                    response_type: None,
                    parameters,
                });
            }
        }

        Ok(ParsedContract {
            title,
            description,
            source_format: SourceFormat::OpenApi,
            base_service_url,
            operations,
            warnings: self.warnings,
        })
    }

    fn parse_document(&self, content: &str) -> Result<serde_json::Value, ParseError> {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(content) {
            return Ok(value);
        }
        serde_yaml::from_str(content).map_err(|e| ParseError::Syntax {
            format: SourceFormat::OpenApi,
            reason: e.to_string(),
        })
    }

    /// Flatten a `parameters` array into typed parameters.
    ///
    /// Unresolved `$ref` entries and unknown locations are dropped with a
    /// warning rather than smuggled through untyped.
    fn collect_parameters(
        &mut self,
        path: &str,
        params: Option<&serde_json::Value>,
    ) -> Vec<Parameter> {
        let Some(list) = params.and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for param in list {
            let Some(obj) = param.as_object() else { continue };
            if obj.contains_key("$ref") {
                self.warnings.push(format!(
                    "unresolved parameter $ref under '{}' was dropped",
                    path
                ));
                continue;
            }
            let Some(name) = obj.get("name").and_then(|v| v.as_str()) else {
                self.warnings
                    .push(format!("unnamed parameter under '{}' was dropped", path));
                continue;
            };
            let location = match obj.get("in").and_then(|v| v.as_str()) {
                Some("path") => ParameterLocation::Path,
                Some("query") => ParameterLocation::Query,
                Some("header") => ParameterLocation::Header,
                Some(other) => {
                    self.warnings.push(format!(
                        "parameter '{}' under '{}' has unsupported location '{}' and was dropped",
                        name, path, other
                    ));
                    continue;
                }
                None => {
                    self.warnings.push(format!(
                        "parameter '{}' under '{}' has no location and was dropped",
                        name, path
                    ));
                    continue;
                }
            };
            out.push(Parameter {
                name: name.to_string(),
                location,
                // Path parameters are always required in OpenAPI.
                required: matches!(location, ParameterLocation::Path)
                    || obj
                        .get("required")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                data_type: obj
                    .get("schema")
                    .and_then(|s| s.get("type"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                example: obj
                    .get("example")
                    .map(|v| v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string())),
            });
        }
        out
    }
}

/// Derive a stable operation name when `operationId` is absent, e.g.
/// `GET /forecast/{day}` -> `get-forecast-day`.
fn derive_operation_name(method: &str, path: &str) -> String {
    let slug: String = path
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        method.to_string()
    } else {
        format!("{}-{}", method, slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-"))
    }
}
