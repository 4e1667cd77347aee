#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use signage_storefront::{
    app_router,
    config::AppConfig,
    db,
    services::payment_gateway::{PaymentGateway, StripeGateway},
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
const MULTIPART_BOUNDARY: &str = "storefront-test-boundary";

/// Part of a multipart form body
pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Helper harness running the full router over a throwaway SQLite database
/// and uploads directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    _dir: TempDir,
}

impl TestApp {
    /// Application without a payment gateway
    pub async fn new() -> Self {
        Self::build(None, |_| {}).await
    }

    /// Application whose payment gateway talks to `api_base`
    pub async fn with_gateway(api_base: &str) -> Self {
        let gateway = StripeGateway::new("sk_test_123", api_base, Duration::from_secs(5))
            .expect("build test gateway");
        Self::build(Some(Arc::new(gateway)), |_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(None, customize).await
    }

    async fn build(
        gateway: Option<Arc<dyn PaymentGateway>>,
        customize: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.uploads_dir = dir.path().join("uploads").display().to_string();
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg, gateway);

        let admin = state
            .services
            .auth
            .create_user("Shop Admin", ADMIN_EMAIL, ADMIN_PASSWORD, true)
            .await
            .expect("seed admin user");
        let admin_token = state
            .services
            .auth
            .issue_token(&admin)
            .expect("issue admin token");

        Self {
            router: app_router(state.clone()),
            state,
            admin_token,
            _dir: dir,
        }
    }

    /// Bearer token for the seeded admin account
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.state.config.uploads_path()
    }

    /// Token for a freshly created non-admin account
    pub async fn shopper_token(&self) -> String {
        let user = self
            .state
            .services
            .auth
            .create_user("Shopper", "shopper@example.com", "shopper-password", false)
            .await
            .expect("seed shopper");
        self.state
            .services
            .auth
            .issue_token(&user)
            .expect("issue shopper token")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
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
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for admin JSON requests.
    pub async fn request_as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.admin_token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    /// Multipart request, as the admin console sends product forms
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        parts: &[FormPart<'_>],
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "shop.test")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            );
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        self.send(
            builder
                .body(Body::from(multipart_body(parts)))
                .expect("failed to build multipart request"),
        )
        .await
    }

    /// Creates a product through the admin endpoint and returns its JSON
    pub async fn create_product(&self, parts: &[FormPart<'_>]) -> Value {
        let token = self.admin_token.clone();
        let response = self
            .multipart(Method::POST, "/api/products", parts, Some(&token))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }
}

fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// File name part of an `/uploads/` URL
pub fn upload_file_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or_default().to_string()
}

pub fn png_part<'a>(file_name: &'a str, bytes: &'a [u8]) -> FormPart<'a> {
    FormPart::File {
        name: "images",
        file_name,
        content_type: "image/png",
        bytes,
    }
}

/// Order payload as the storefront checkout submits it
pub fn order_payload(email: &str, items: Value, shipping: &str) -> Value {
    serde_json::json!({
        "customer": {
            "name": "Jane Doe",
            "email": email,
            "phone": "555-0100",
            "address": "1 Main St",
            "city": "Springfield",
            "country": "USA"
        },
        "items": items,
        "shipping": { "method": shipping, "cost": 0 },
        "total": 1
    })
}

pub fn line(product_id: &str, name: &str, price: f64, quantity: u32) -> Value {
    serde_json::json!({
        "productId": product_id,
        "name": name,
        "price": price,
        "quantity": quantity
    })
}
