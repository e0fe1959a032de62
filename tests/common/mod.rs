use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware,
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use niaga_api::{
    auth::{self, AuthService},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::{self, AppServices},
    services::{
        customers::CreateCustomerRequest, products::CreateProductRequest,
        taxes::CreateTaxRequest, users::CreateUserRequest,
    },
    AppState,
};

/// Test harness backed by a throwaway SQLite database. The router carries
/// the same auth and role-guard layers as the real server, so requests go
/// through the stack a production client would hit.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Fresh database, migrated schema, one seeded user per role.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("niaga_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "integration_test_signing_key_0123456789_abcdefghijklmnopqrstuvwxyz".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Some(event_sender.clone()));
        let auth_service = Arc::new(AuthService::new(&cfg));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender: Some(event_sender),
            services,
            auth_service: auth_service.clone(),
        };

        // One user per role so tests can exercise the permission table
        for (username, role) in [
            ("admin", "ADMIN"),
            ("finance", "FINANCE"),
            ("sales", "SALES"),
            ("warehouse", "WAREHOUSE"),
        ] {
            state
                .services
                .users
                .create_user(CreateUserRequest {
                    username: username.to_string(),
                    password: format!("{}-password-1", username),
                    full_name: format!("Test {}", username),
                    role: role.to_string(),
                })
                .await
                .expect("seed test user");
        }

        let api_v1 = niaga_api::api_v1_routes()
            .layer(middleware::from_fn(auth::role_guard))
            .layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth::auth_middleware,
            ));

        let auth_router = handlers::auth::public_routes().merge(
            handlers::auth::protected_routes().layer(middleware::from_fn_with_state(
                auth_service,
                auth::auth_middleware,
            )),
        );

        let router = Router::new()
            .nest("/api/v1", api_v1)
            .nest("/auth", auth_router)
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Logs in over the real route and returns the bearer token.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(serde_json::json!({
                    "username": username,
                    "password": format!("{}-password-1", username),
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), 200, "login should succeed");

        let body = response_json(response).await;
        body["data"]["access_token"]
            .as_str()
            .expect("login response carries a token")
            .to_string()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seeds the active tax every pricing path depends on.
    pub async fn seed_active_tax(&self) {
        self.state
            .services
            .taxes
            .create_tax(CreateTaxRequest {
                name: "PPN 11%".to_string(),
                rate: dec!(0.11),
                is_active: Some(true),
            })
            .await
            .expect("seed active tax");
    }

    pub async fn seed_customer(&self, name: &str) -> Uuid {
        self.state
            .services
            .customers
            .create_customer(CreateCustomerRequest {
                name: name.to_string(),
                contact_person: None,
                phone: None,
                email: None,
                address: Some("Jl. Test No. 1".to_string()),
                city: Some("Surabaya".to_string()),
                notes: None,
            })
            .await
            .expect("seed customer")
            .id
    }

    /// Returns (product_id, selling_price).
    pub async fn seed_product(&self, sku: &str, base_price: Decimal) -> (Uuid, Decimal) {
        let product = self
            .state
            .services
            .products
            .create_product(CreateProductRequest {
                sku: sku.to_string(),
                name: format!("Test Product {}", sku),
                unit: "karton".to_string(),
                base_price,
                stock_quantity: Some(100),
                description: None,
            })
            .await
            .expect("seed product");
        (product.id, product.selling_price)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
