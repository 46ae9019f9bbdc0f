//! Lifecycle and orchestration tests
//!
//! Exercises the engine end to end against the in-memory management plane:
//! contract import, versioning, revisions and dependency orchestration.

use std::sync::Arc;

use gateway_lifecycle_sdk::models::{ProductSpec, ProductState, SubscriptionSpec, VersioningScheme};
use gateway_lifecycle_sdk::{
    ApiIdentity, DependencyOrchestrator, InMemoryGatewayClient, LifecycleError, LifecycleManager,
    ParsedContract, SourceFormat, parser, versioning,
};

const FORECAST_YAML: &str = r#"
openapi: "3.0.1"
info:
  title: Weather API
  version: "1.0.0"
  description: Weather forecasts
servers:
  - url: https://backend.example.com/weather
paths:
  /forecast:
    get:
      operationId: getForecast
      summary: Get forecast
"#;

const USER_PROTO: &str = r#"
syntax = "proto3";
package users;

message GetUserRequest { string id = 1; }
message User { string id = 1; }

service UserService {
  rpc GetUser(GetUserRequest) returns (User);
}
"#;

fn forecast_contract() -> ParsedContract {
    parser::parse(FORECAST_YAML, SourceFormat::OpenApi).unwrap()
}

fn setup() -> (Arc<InMemoryGatewayClient>, LifecycleManager) {
    let client = Arc::new(InMemoryGatewayClient::new());
    let manager = LifecycleManager::new(client.clone());
    (client, manager)
}

mod api_lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_segment_versioning_round_trip() {
        let (_, manager) = setup();
        let routing =
            versioning::resolve(VersioningScheme::Segment, "v1", None, None).unwrap();
        let api = manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&routing),
            )
            .await
            .unwrap();

        assert_eq!(api.path, "weather/v1");
        assert_eq!(api.api_version.as_deref(), Some("v1"));
        assert_eq!(api.versioning_scheme, Some(VersioningScheme::Segment));

        let ops = manager.get_operations("weather-api").await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].method.as_deref(), Some("GET"));
        assert_eq!(ops[0].url_template.as_deref(), Some("/forecast"));
    }

    #[tokio::test]
    async fn test_create_or_update_is_idempotent() {
        let (_, manager) = setup();
        let identity = ApiIdentity::new("weather-api", "weather");
        let contract = forecast_contract();

        let first = manager
            .create_or_update_api(&identity, &contract, None)
            .await
            .unwrap();
        let second = manager
            .create_or_update_api(&identity, &contract, None)
            .await
            .unwrap();

        assert_eq!(first, second);
        let ops = manager.get_operations("weather-api").await.unwrap();
        assert_eq!(ops.len(), 1, "re-import must not duplicate operations");
    }

    #[tokio::test]
    async fn test_update_converges_to_new_contract() {
        let (_, manager) = setup();
        let identity = ApiIdentity::new("weather-api", "weather");
        manager
            .create_or_update_api(&identity, &forecast_contract(), None)
            .await
            .unwrap();

        let wider = r#"
openapi: "3.0.1"
info:
  title: Weather API v2
  version: "2.0.0"
paths:
  /forecast:
    post:
      operationId: postForecast
  /alerts:
    get:
      operationId: getAlerts
"#;
        let contract = parser::parse(wider, SourceFormat::OpenApi).unwrap();
        let api = manager
            .create_or_update_api(&identity, &contract, None)
            .await
            .unwrap();

        assert_eq!(api.display_name, "Weather API v2");
        let ops = manager.get_operations("weather-api").await.unwrap();
        assert_eq!(ops.len(), 2, "stale operations must be dropped, new ones imported");
        assert!(ops.iter().all(|op| op.url_template.is_some()));
    }

    #[tokio::test]
    async fn test_empty_contract_is_accepted() {
        let (_, manager) = setup();
        let empty = r#"
openapi: "3.1.0"
info:
  title: Empty API
  version: "1.0"
paths: {}
"#;
        let contract = parser::parse(empty, SourceFormat::OpenApi).unwrap();
        assert!(contract.operations.is_empty());

        let api = manager
            .create_or_update_api(&ApiIdentity::new("empty-api", "empty"), &contract, None)
            .await
            .unwrap();
        assert_eq!(api.api_id, "empty-api");
        assert!(manager.get_operations("empty-api").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grpc_import_twice_keeps_one_operation() {
        let (_, manager) = setup();
        let contract = parser::parse(USER_PROTO, SourceFormat::Protobuf).unwrap();
        let identity = ApiIdentity::new("user-api", "users");

        manager
            .create_or_update_api(&identity, &contract, None)
            .await
            .unwrap();
        manager
            .create_or_update_api(&identity, &contract, None)
            .await
            .unwrap();

        let ops = manager.get_operations("user-api").await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].rpc_name.as_deref(), Some("GetUser"));
        assert_eq!(
            ops[0].service_method_path.as_deref(),
            Some("/users.UserService/GetUser")
        );
    }
}

mod versioning_tests {
    use super::*;

    #[tokio::test]
    async fn test_query_versioning_leaves_path_unchanged() {
        let (client, manager) = setup();
        let routing = versioning::resolve(
            VersioningScheme::Query,
            "v1.0",
            Some("api-version"),
            None,
        )
        .unwrap();
        let api = manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&routing),
            )
            .await
            .unwrap();

        assert_eq!(api.path, "weather", "query versioning must not touch the path");
        assert_eq!(api.api_version.as_deref(), Some("v1.0"));

        use gateway_lifecycle_sdk::GatewayClient;
        let set = client
            .get_version_set(api.version_set_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(set.versioning_scheme, VersioningScheme::Query);
        assert_eq!(set.version_query_name.as_deref(), Some("api-version"));
    }

    #[tokio::test]
    async fn test_scheme_conflict_on_new_version() {
        let (_, manager) = setup();
        let segment = versioning::resolve(VersioningScheme::Segment, "v1", None, None).unwrap();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&segment),
            )
            .await
            .unwrap();

        let header = versioning::resolve(VersioningScheme::Header, "v2", None, None).unwrap();
        let err = manager
            .create_version("weather-api", "v2", &header, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::SchemeConflict(_)));

        // Same scheme succeeds.
        let segment_v2 =
            versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
        let api = manager
            .create_version("weather-api", "v2", &segment_v2, None)
            .await
            .unwrap();
        assert_eq!(api.api_id, "weather-api-v2");
        assert_eq!(api.path, "weather/v2");
    }

    #[tokio::test]
    async fn test_new_version_without_contract_has_zero_operations() {
        let (_, manager) = setup();
        let segment = versioning::resolve(VersioningScheme::Segment, "v1", None, None).unwrap();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&segment),
            )
            .await
            .unwrap();

        let segment_v2 =
            versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
        manager
            .create_version("weather-api", "v2", &segment_v2, None)
            .await
            .unwrap();

        // Operations are not copied from the prior version.
        assert!(manager.get_operations("weather-api-v2").await.unwrap().is_empty());
        assert_eq!(manager.get_operations("weather-api").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_version_with_contract_imports_operations() {
        let (_, manager) = setup();
        let segment = versioning::resolve(VersioningScheme::Segment, "v1", None, None).unwrap();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&segment),
            )
            .await
            .unwrap();

        let segment_v2 =
            versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
        let contract = forecast_contract();
        manager
            .create_version("weather-api", "v2", &segment_v2, Some(&contract))
            .await
            .unwrap();
        assert_eq!(manager.get_operations("weather-api-v2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_version_of_missing_api_is_not_found() {
        let (_, manager) = setup();
        let routing = versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
        let err = manager
            .create_version("ghost-api", "v2", &routing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound { entity: "api", .. }));
    }

    #[tokio::test]
    async fn test_version_of_unversioned_api_requires_version_set() {
        let (_, manager) = setup();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                None,
            )
            .await
            .unwrap();

        let routing = versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
        let err = manager
            .create_version("weather-api", "v2", &routing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound { entity: "version set", .. }));
    }

    #[tokio::test]
    async fn test_list_versions() {
        let (_, manager) = setup();
        let v1 = versioning::resolve(VersioningScheme::Segment, "v1", None, None).unwrap();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&v1),
            )
            .await
            .unwrap();
        let v2 = versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
        manager
            .create_version("weather-api", "v2", &v2, None)
            .await
            .unwrap();

        let versions = manager.list_versions("weather-api").await.unwrap();
        assert_eq!(versions.len(), 2);
    }

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    use gateway_lifecycle_sdk::models::{
        ApiResource, ApiRevision, Backend, Operation, Product, Subscription, VersionSet,
    };
    use gateway_lifecycle_sdk::{GatewayClient, GatewayError};

    /// Pauses the first operation import for one api id so a test can hold
    /// the engine mid-mutation and probe what else is allowed to run.
    struct PausingClient {
        inner: InMemoryGatewayClient,
        paused_api: String,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl PausingClient {
        fn new(paused_api: &str) -> Self {
            Self {
                inner: InMemoryGatewayClient::new(),
                paused_api: paused_api.to_string(),
                armed: AtomicBool::new(true),
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl GatewayClient for PausingClient {
        async fn get_api(&self, api_id: &str) -> Result<ApiResource, GatewayError> {
            self.inner.get_api(api_id).await
        }

        async fn create_or_update_api(
            &self,
            api: &ApiResource,
        ) -> Result<ApiResource, GatewayError> {
            self.inner.create_or_update_api(api).await
        }

        async fn list_apis_in_version_set(
            &self,
            version_set_id: &str,
        ) -> Result<Vec<ApiResource>, GatewayError> {
            self.inner.list_apis_in_version_set(version_set_id).await
        }

        async fn list_operations(&self, api_id: &str) -> Result<Vec<Operation>, GatewayError> {
            self.inner.list_operations(api_id).await
        }

        async fn import_operations(
            &self,
            api_id: &str,
            operations: &[Operation],
        ) -> Result<(), GatewayError> {
            if api_id == self.paused_api && self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.import_operations(api_id, operations).await
        }

        async fn get_version_set(&self, version_set_id: &str) -> Result<VersionSet, GatewayError> {
            self.inner.get_version_set(version_set_id).await
        }

        async fn create_version_set(&self, set: &VersionSet) -> Result<VersionSet, GatewayError> {
            self.inner.create_version_set(set).await
        }

        async fn create_revision(
            &self,
            api_id: &str,
            description: Option<&str>,
        ) -> Result<ApiRevision, GatewayError> {
            self.inner.create_revision(api_id, description).await
        }

        async fn list_revisions(&self, api_id: &str) -> Result<Vec<ApiRevision>, GatewayError> {
            self.inner.list_revisions(api_id).await
        }

        async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError> {
            self.inner.get_product(product_id).await
        }

        async fn create_or_update_product(
            &self,
            product: &Product,
        ) -> Result<Product, GatewayError> {
            self.inner.create_or_update_product(product).await
        }

        async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
            self.inner.list_products().await
        }

        async fn associate_api_to_product(
            &self,
            product_id: &str,
            api_id: &str,
        ) -> Result<(), GatewayError> {
            self.inner.associate_api_to_product(product_id, api_id).await
        }

        async fn list_api_products(&self, api_id: &str) -> Result<Vec<Product>, GatewayError> {
            self.inner.list_api_products(api_id).await
        }

        async fn create_subscription(
            &self,
            spec: &SubscriptionSpec,
        ) -> Result<Subscription, GatewayError> {
            self.inner.create_subscription(spec).await
        }

        async fn list_subscriptions(&self) -> Result<Vec<Subscription>, GatewayError> {
            self.inner.list_subscriptions().await
        }

        async fn list_backends(&self) -> Result<Vec<Backend>, GatewayError> {
            self.inner.list_backends().await
        }
    }

    #[tokio::test]
    async fn test_concurrent_upsert_of_new_version_id_serializes() {
        let client = Arc::new(PausingClient::new("weather-api-v2"));
        let manager = Arc::new(LifecycleManager::new(client.clone()));
        let v1 = versioning::resolve(VersioningScheme::Segment, "v1", None, None).unwrap();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                Some(&v1),
            )
            .await
            .unwrap();

        // create_version stalls inside the derived api's operation import,
        // holding both the base and the derived identity locks.
        let version_task = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let v2 =
                    versioning::resolve(VersioningScheme::Segment, "v2", None, None).unwrap();
                manager
                    .create_version("weather-api", "v2", &v2, Some(&forecast_contract()))
                    .await
            })
        };
        client.entered.notified().await;

        let upsert_task = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .create_or_update_api(
                        &ApiIdentity::new("weather-api-v2", "weather/v2"),
                        &forecast_contract(),
                        None,
                    )
                    .await
            })
        };

        // The derived id is mid-mutation, so its upsert must stay blocked.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            !upsert_task.is_finished(),
            "upsert of weather-api-v2 ran while create_version was mid-mutation"
        );

        client.release.notify_one();
        version_task.await.unwrap().unwrap();
        upsert_task.await.unwrap().unwrap();

        let ops = manager.get_operations("weather-api-v2").await.unwrap();
        assert_eq!(ops.len(), 1);
    }
}

mod revision_tests {
    use super::*;

    #[tokio::test]
    async fn test_exactly_one_current_revision() {
        let (_, manager) = setup();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                None,
            )
            .await
            .unwrap();

        // Revision 1 is implicit.
        let revisions = manager.list_revisions("weather-api").await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert!(revisions[0].is_current);

        manager
            .create_revision("weather-api", Some("tighten schemas"))
            .await
            .unwrap();
        let third = manager.create_revision("weather-api", None).await.unwrap();
        assert_eq!(third.revision_number, 3);
        assert!(third.is_current);

        let revisions = manager.list_revisions("weather-api").await.unwrap();
        assert_eq!(revisions.len(), 3);
        assert_eq!(revisions.iter().filter(|r| r.is_current).count(), 1);
        let numbers: Vec<u32> = revisions.iter().map(|r| r.revision_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_revision_of_missing_api_is_not_found() {
        let (_, manager) = setup();
        let err = manager
            .create_revision("ghost-api", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound { entity: "api", .. }));
    }
}

mod orchestration_tests {
    use super::*;

    async fn setup_with_api() -> (Arc<InMemoryGatewayClient>, LifecycleManager, DependencyOrchestrator)
    {
        let (client, manager) = setup();
        manager
            .create_or_update_api(
                &ApiIdentity::new("weather-api", "weather"),
                &forecast_contract(),
                None,
            )
            .await
            .unwrap();
        let orchestrator = DependencyOrchestrator::new(client.clone());
        (client, manager, orchestrator)
    }

    #[tokio::test]
    async fn test_associate_missing_product_fails_precondition() {
        let (_, _, orchestrator) = setup_with_api().await;
        let err = orchestrator
            .associate_api("missing-product", "weather-api")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PreconditionFailed { missing: "product", .. }
        ));
    }

    #[tokio::test]
    async fn test_associate_missing_api_fails_precondition() {
        let (_, _, orchestrator) = setup_with_api().await;
        orchestrator
            .ensure_product(&ProductSpec::new("starter", "Starter"))
            .await
            .unwrap();
        let err = orchestrator
            .associate_api("starter", "ghost-api")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PreconditionFailed { missing: "api", .. }
        ));
    }

    #[tokio::test]
    async fn test_repeat_association_is_noop_success() {
        let (_, _, orchestrator) = setup_with_api().await;
        orchestrator
            .ensure_product(&ProductSpec::new("starter", "Starter"))
            .await
            .unwrap();

        orchestrator.associate_api("starter", "weather-api").await.unwrap();
        orchestrator.associate_api("starter", "weather-api").await.unwrap();

        let products = orchestrator.api_products("weather-api").await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, "starter");
    }

    #[tokio::test]
    async fn test_ensure_product_is_idempotent_and_unpublished() {
        let (_, _, orchestrator) = setup_with_api().await;
        let spec = ProductSpec::new("starter", "Starter");
        let first = orchestrator.ensure_product(&spec).await.unwrap();
        assert_eq!(first.state, ProductState::NotPublished);

        let mut renamed = spec.clone();
        renamed.display_name = "Starter Tier".to_string();
        let second = orchestrator.ensure_product(&renamed).await.unwrap();
        assert_eq!(second.display_name, "Starter Tier");
        assert_eq!(second.state, ProductState::NotPublished);
        assert_eq!(orchestrator.products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_product_transition() {
        let (_, _, orchestrator) = setup_with_api().await;
        orchestrator
            .ensure_product(&ProductSpec::new("starter", "Starter"))
            .await
            .unwrap();

        let published = orchestrator.publish_product("starter").await.unwrap();
        assert_eq!(published.state, ProductState::Published);
        // Idempotent.
        let again = orchestrator.publish_product("starter").await.unwrap();
        assert_eq!(again.state, ProductState::Published);

        // Convergence keeps the published state.
        let converged = orchestrator
            .ensure_product(&ProductSpec::new("starter", "Starter"))
            .await
            .unwrap();
        assert_eq!(converged.state, ProductState::Published);
    }

    #[tokio::test]
    async fn test_subscription_requires_product() {
        let (_, _, orchestrator) = setup_with_api().await;
        let err = orchestrator
            .ensure_subscription(&SubscriptionSpec::new("sub-1", "Dev sub", "missing-product"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PreconditionFailed { missing: "product", .. }
        ));
    }

    #[tokio::test]
    async fn test_subscription_keys_generated_and_stable() {
        let (_, _, orchestrator) = setup_with_api().await;
        orchestrator
            .ensure_product(&ProductSpec::new("starter", "Starter"))
            .await
            .unwrap();

        let spec = SubscriptionSpec::new("sub-1", "Dev sub", "starter");
        let first = orchestrator.ensure_subscription(&spec).await.unwrap();
        assert!(!first.primary_key.expose().is_empty());
        assert_ne!(first.primary_key.expose(), first.secondary_key.expose());
        // Debug output must never leak the key material.
        assert!(!format!("{:?}", first).contains(first.primary_key.expose()));

        let second = orchestrator.ensure_subscription(&spec).await.unwrap();
        assert_eq!(first.primary_key.expose(), second.primary_key.expose());
        assert_eq!(orchestrator.subscriptions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_backends() {
        let (client, _, orchestrator) = setup_with_api().await;
        use gateway_lifecycle_sdk::models::{Backend, BackendProtocol};
        client.add_backend(Backend {
            name: "weather-backend".to_string(),
            url: "https://backend.example.com/weather".to_string(),
            protocol: BackendProtocol::Http,
            credentials: None,
            tls: None,
        });
        let backends = orchestrator.backends().await.unwrap();
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].name, "weather-backend");
    }
}
