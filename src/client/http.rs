//! HTTP gateway client
//!
//! Implements `GatewayClient` over a management-plane HTTP API.
//!
//! ## Security
//!
//! All resource ids are validated before being interpolated into request
//! paths. Only alphanumeric characters, hyphens, underscores and periods
//! are allowed.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{
    ApiResource, ApiRevision, Backend, Operation, Product, Subscription, SubscriptionSpec,
    VersionSet,
};

use super::{GatewayClient, GatewayError};

/// Maximum allowed length for resource ids
const MAX_ID_LENGTH: usize = 256;

/// Validate a resource id for safe use in request paths.
///
/// Rejects empty, overlong and traversal-prone values so an id can never
/// rewrite the request path.
fn validate_resource_id(id: &str) -> Result<(), GatewayError> {
    if id.is_empty() {
        return Err(GatewayError::Protocol(
            "resource id cannot be empty".to_string(),
        ));
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(GatewayError::Protocol(format!(
            "resource id too long (max {} characters)",
            MAX_ID_LENGTH
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(GatewayError::Protocol(format!(
            "resource id '{}' contains invalid characters",
            id
        )));
    }
    if id.starts_with('.') {
        return Err(GatewayError::Protocol(
            "resource id cannot start with a period".to_string(),
        ));
    }
    Ok(())
}

/// Gateway client that talks to a management plane over HTTP
pub struct HttpGatewayClient {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpGatewayClient {
    /// Create a new HTTP gateway client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the management plane (e.g. "https://mgmt.example.com/api/v1")
    /// * `auth_token` - Optional bearer token
    /// * `timeout` - Caller-supplied timeout applied to every remote call.
    ///   On expiry the call fails with [`GatewayError::Timeout`]; the client
    ///   never retries on its own.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Protocol(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            auth_token,
            client,
        })
    }

    fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(ref token) = self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    fn map_send_error(context: &str, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(format!("{}: {}", context, error))
        } else {
            GatewayError::Unavailable(format!("{}: {}", context, error))
        }
    }

    fn map_status(context: &str, status: reqwest::StatusCode) -> GatewayError {
        match status.as_u16() {
            404 => GatewayError::NotFound(context.to_string()),
            409 => GatewayError::Conflict(context.to_string()),
            401 | 403 => GatewayError::Unauthorized(context.to_string()),
            502 | 503 | 504 => {
                GatewayError::Unavailable(format!("{}: upstream {}", context, status))
            }
            _ => GatewayError::Protocol(format!("{}: unexpected status {}", context, status)),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        context: &str,
        path: &str,
    ) -> Result<T, GatewayError> {
        let response = self
            .build_request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| Self::map_send_error(context, e))?;
        if !response.status().is_success() {
            return Err(Self::map_status(context, response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("{}: malformed response: {}", context, e)))
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        context: &str,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .build_request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(context, e))?;
        if !response.status().is_success() {
            return Err(Self::map_status(context, response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("{}: malformed response: {}", context, e)))
    }

    fn encoded(id: &str) -> Result<String, GatewayError> {
        validate_resource_id(id)?;
        Ok(urlencoding::encode(id).into_owned())
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn get_api(&self, api_id: &str) -> Result<ApiResource, GatewayError> {
        let id = Self::encoded(api_id)?;
        self.get_json(&format!("api '{}'", api_id), &format!("/apis/{}", id))
            .await
    }

    async fn create_or_update_api(&self, api: &ApiResource) -> Result<ApiResource, GatewayError> {
        let id = Self::encoded(&api.api_id)?;
        self.put_json(
            &format!("api '{}'", api.api_id),
            &format!("/apis/{}", id),
            api,
        )
        .await
    }

    async fn list_apis_in_version_set(
        &self,
        version_set_id: &str,
    ) -> Result<Vec<ApiResource>, GatewayError> {
        let id = Self::encoded(version_set_id)?;
        self.get_json(
            &format!("version set '{}'", version_set_id),
            &format!("/version-sets/{}/apis", id),
        )
        .await
    }

    async fn list_operations(&self, api_id: &str) -> Result<Vec<Operation>, GatewayError> {
        let id = Self::encoded(api_id)?;
        self.get_json(
            &format!("operations of api '{}'", api_id),
            &format!("/apis/{}/operations", id),
        )
        .await
    }

    async fn import_operations(
        &self,
        api_id: &str,
        operations: &[Operation],
    ) -> Result<(), GatewayError> {
        let id = Self::encoded(api_id)?;
        let context = format!("operations of api '{}'", api_id);
        let response = self
            .build_request(reqwest::Method::PUT, &format!("/apis/{}/operations", id))
            .json(&operations)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&context, e))?;
        if !response.status().is_success() {
            return Err(Self::map_status(&context, response.status()));
        }
        Ok(())
    }

    async fn get_version_set(&self, version_set_id: &str) -> Result<VersionSet, GatewayError> {
        let id = Self::encoded(version_set_id)?;
        self.get_json(
            &format!("version set '{}'", version_set_id),
            &format!("/version-sets/{}", id),
        )
        .await
    }

    async fn create_version_set(&self, set: &VersionSet) -> Result<VersionSet, GatewayError> {
        let id = Self::encoded(&set.version_set_id)?;
        self.put_json(
            &format!("version set '{}'", set.version_set_id),
            &format!("/version-sets/{}", id),
            set,
        )
        .await
    }

    async fn create_revision(
        &self,
        api_id: &str,
        description: Option<&str>,
    ) -> Result<ApiRevision, GatewayError> {
        let id = Self::encoded(api_id)?;
        #[derive(serde::Serialize)]
        struct RevisionRequest<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            description: Option<&'a str>,
        }
        let context = format!("revision of api '{}'", api_id);
        let response = self
            .build_request(reqwest::Method::POST, &format!("/apis/{}/revisions", id))
            .json(&RevisionRequest { description })
            .send()
            .await
            .map_err(|e| Self::map_send_error(&context, e))?;
        if !response.status().is_success() {
            return Err(Self::map_status(&context, response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("{}: malformed response: {}", context, e)))
    }

    async fn list_revisions(&self, api_id: &str) -> Result<Vec<ApiRevision>, GatewayError> {
        let id = Self::encoded(api_id)?;
        self.get_json(
            &format!("revisions of api '{}'", api_id),
            &format!("/apis/{}/revisions", id),
        )
        .await
    }

    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError> {
        let id = Self::encoded(product_id)?;
        self.get_json(
            &format!("product '{}'", product_id),
            &format!("/products/{}", id),
        )
        .await
    }

    async fn create_or_update_product(&self, product: &Product) -> Result<Product, GatewayError> {
        let id = Self::encoded(&product.product_id)?;
        self.put_json(
            &format!("product '{}'", product.product_id),
            &format!("/products/{}", id),
            product,
        )
        .await
    }

    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        self.get_json("products", "/products").await
    }

    async fn associate_api_to_product(
        &self,
        product_id: &str,
        api_id: &str,
    ) -> Result<(), GatewayError> {
        let pid = Self::encoded(product_id)?;
        let aid = Self::encoded(api_id)?;
        let context = format!("association of api '{}' to product '{}'", api_id, product_id);
        let response = self
            .build_request(
                reqwest::Method::PUT,
                &format!("/products/{}/apis/{}", pid, aid),
            )
            .send()
            .await
            .map_err(|e| Self::map_send_error(&context, e))?;
        if !response.status().is_success() {
            return Err(Self::map_status(&context, response.status()));
        }
        Ok(())
    }

    async fn list_api_products(&self, api_id: &str) -> Result<Vec<Product>, GatewayError> {
        let id = Self::encoded(api_id)?;
        self.get_json(
            &format!("products of api '{}'", api_id),
            &format!("/apis/{}/products", id),
        )
        .await
    }

    async fn create_subscription(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<Subscription, GatewayError> {
        let id = Self::encoded(&spec.subscription_id)?;
        self.put_json(
            &format!("subscription '{}'", spec.subscription_id),
            &format!("/subscriptions/{}", id),
            spec,
        )
        .await
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, GatewayError> {
        self.get_json("subscriptions", "/subscriptions").await
    }

    async fn list_backends(&self) -> Result<Vec<Backend>, GatewayError> {
        self.get_json("backends", "/backends").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_resource_id_valid() {
        assert!(validate_resource_id("weather-api").is_ok());
        assert!(validate_resource_id("weather_api").is_ok());
        assert!(validate_resource_id("api.v1").is_ok());
        assert!(validate_resource_id("Api123").is_ok());
    }

    #[test]
    fn test_validate_resource_id_empty() {
        assert!(matches!(
            validate_resource_id(""),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn test_validate_resource_id_too_long() {
        let long = "a".repeat(257);
        assert!(validate_resource_id(&long).is_err());
    }

    #[test]
    fn test_validate_resource_id_invalid_chars() {
        assert!(validate_resource_id("../etc").is_err());
        assert!(validate_resource_id("api/v1").is_err());
        assert!(validate_resource_id("api?x=1").is_err());
        assert!(validate_resource_id("api with spaces").is_err());
        assert!(validate_resource_id(".hidden").is_err());
    }

    #[test]
    fn test_map_status() {
        assert!(matches!(
            HttpGatewayClient::map_status("x", reqwest::StatusCode::NOT_FOUND),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            HttpGatewayClient::map_status("x", reqwest::StatusCode::CONFLICT),
            GatewayError::Conflict(_)
        ));
        assert!(matches!(
            HttpGatewayClient::map_status("x", reqwest::StatusCode::UNAUTHORIZED),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            HttpGatewayClient::map_status("x", reqwest::StatusCode::SERVICE_UNAVAILABLE),
            GatewayError::Unavailable(_)
        ));
    }
}
