//! Shared enums for gateway resources and parsed contracts

use serde::{Deserialize, Serialize};

/// Source format of an imported API contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// OpenAPI 3.x, YAML or JSON text
    OpenApi,
    /// Protobuf proto3 service definition, text form
    Protobuf,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::OpenApi => write!(f, "openapi"),
            SourceFormat::Protobuf => write!(f, "protobuf"),
        }
    }
}

/// Where an operation parameter is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

/// How a caller selects an API version at request time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningScheme {
    /// Version is a path segment appended to the API's base path
    Segment,
    /// Version is carried in a query parameter
    Query,
    /// Version is carried in a request header
    Header,
}

impl std::fmt::Display for VersioningScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersioningScheme::Segment => write!(f, "segment"),
            VersioningScheme::Query => write!(f, "query"),
            VersioningScheme::Header => write!(f, "header"),
        }
    }
}

/// Transport protocols an API is exposed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Grpc,
}

/// Publication state of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductState {
    Published,
    NotPublished,
}

/// Lifecycle state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionState {
    Active,
    Suspended,
    Cancelled,
}

/// Protocol spoken by a backend service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProtocol {
    Http,
    Soap,
    Fabric,
}
