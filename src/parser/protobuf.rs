//! Protobuf contract parser
//!
//! Parses proto3 service definitions (text form) into a [`ParsedContract`].
//! Each `rpc` declaration becomes one [`Operation`] carrying the rpc name,
//! the gRPC method path (`/package.Service/Method`) and the request/response
//! message types. The parser does not resolve `import` statements; an
//! unresolved import is recorded as a warning, not a fatal error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{Operation, ParsedContract, SourceFormat};

use super::ParseError;

static SYNTAX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"syntax\s*=\s*"(proto\d)"\s*;"#).expect("static regex"));
static PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"package\s+([A-Za-z_][\w.]*)\s*;").expect("static regex"));
static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+(?:public\s+)?"([^"]+)"\s*;"#).expect("static regex"));
static MESSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"message\s+([A-Za-z_]\w*)\s*\{").expect("static regex"));
static SERVICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"service\s+([A-Za-z_]\w*)\s*\{").expect("static regex"));
static RPC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"rpc\s+([A-Za-z_]\w*)\s*\(\s*(stream\s+)?([A-Za-z_][\w.]*)\s*\)\s*returns\s*\(\s*(stream\s+)?([A-Za-z_][\w.]*)\s*\)",
    )
    .expect("static regex")
});

/// Proto3 service definition parser
#[derive(Debug, Default)]
pub struct ProtobufParser {
    warnings: Vec<String>,
}

impl ProtobufParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse proto3 text into a `ParsedContract`.
    ///
    /// Requires a `syntax = "proto3"` declaration and at least one `service`
    /// block. A service with zero rpcs yields an empty operation list. An
    /// rpc referencing a message that is neither defined in the file nor
    /// plausibly supplied by an import fails with
    /// [`ParseError::UndefinedMessage`]; when unresolved imports are present
    /// the missing definition degrades to a warning.
    pub fn parse(mut self, content: &str) -> Result<ParsedContract, ParseError> {
        let content = strip_comments(content);

        let syntax = SYNTAX_RE
            .captures(&content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ParseError::InvalidField {
                format: SourceFormat::Protobuf,
                field: "syntax".to_string(),
                reason: "missing syntax declaration".to_string(),
            })?;
        if syntax != "proto3" {
            return Err(ParseError::UnsupportedVersion {
                format: SourceFormat::Protobuf,
                version: syntax,
                reason: "only proto3 is supported".to_string(),
            });
        }

        let package = PACKAGE_RE
            .captures(&content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let imports: Vec<String> = IMPORT_RE
            .captures_iter(&content)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        for import in &imports {
            self.warnings
                .push(format!("import \"{}\" was not resolved", import));
        }

        let messages: HashSet<String> = MESSAGE_RE
            .captures_iter(&content)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();

        let services: Vec<(String, String)> = extract_services(&content);
        if services.is_empty() {
            return Err(ParseError::InvalidField {
                format: SourceFormat::Protobuf,
                field: "service".to_string(),
                reason: "at least one service block is required".to_string(),
            });
        }

        let mut operations = Vec::new();
        for (service_name, body) in &services {
            let qualified_service = match &package {
                Some(pkg) => format!("{}.{}", pkg, service_name),
                None => service_name.clone(),
            };
            for caps in RPC_RE.captures_iter(body) {
                let rpc_name = caps[1].to_string();
                let request_type = caps[3].to_string();
                let response_type = caps[5].to_string();

                for message in [&request_type, &response_type] {
                    self.check_message_defined(&rpc_name, message, &messages, &imports)?;
                }

                operations.push(Operation {
                    name: rpc_name.clone(),
                    display_name: format!("{}.{}", service_name, rpc_name),
                    method: None,
                    url_template: None,
                    rpc_name: Some(rpc_name.clone()),
                    service_method_path: Some(format!("/{}/{}", qualified_service, rpc_name)),
                    description: None,
                    request_type: Some(request_type),
                    response_type: Some(response_type),
                    parameters: Vec::new(),
                });
            }
        }

        let title = package
            .clone()
            .unwrap_or_else(|| services[0].0.clone());

        Ok(ParsedContract {
            title,
            description: None,
            source_format: SourceFormat::Protobuf,
            base_service_url: None,
            operations,
            warnings: self.warnings,
        })
    }

    /// Enforce the rpc -> message definedness rule.
    ///
    /// Well-known types and qualified names are assumed external. A locally
    /// undefined unqualified message is fatal unless unresolved imports could
    /// supply it, in which case it is a warning.
    fn check_message_defined(
        &mut self,
        rpc: &str,
        message: &str,
        local: &HashSet<String>,
        imports: &[String],
    ) -> Result<(), ParseError> {
        if local.contains(message) || message.contains('.') {
            return Ok(());
        }
        if imports.is_empty() {
            return Err(ParseError::UndefinedMessage {
                rpc: rpc.to_string(),
                message: message.to_string(),
            });
        }
        self.warnings.push(format!(
            "message '{}' referenced by rpc '{}' is not defined locally; assuming it comes from an import",
            message, rpc
        ));
        Ok(())
    }
}

/// Remove `//` line comments and `/* */` block comments.
fn strip_comments(content: &str) -> String {
    static BLOCK_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));
    let without_blocks = BLOCK_RE.replace_all(content, "");
    without_blocks
        .lines()
        .map(|line| match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract `(service_name, body)` pairs by brace matching.
///
/// Regex alone cannot delimit nested bodies, so the body is scanned from the
/// opening brace of each `service` declaration.
fn extract_services(content: &str) -> Vec<(String, String)> {
    let mut services = Vec::new();
    for caps in SERVICE_RE.captures_iter(content) {
        let name = caps[1].to_string();
        let open = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let mut depth = 1usize;
        let mut end = open;
        for (i, c) in content[open..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = open + i;
                        break;
                    }
                }
                _ => {}
            }
        }
        services.push((name, content[open..end].to_string()));
    }
    services
}
