//! Signage Storefront API Library
//!
//! Catalog, cart pricing, checkout and order administration for a custom
//! event-signage shop.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, services::ServeDir, timeout::TimeoutLayer};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        gateway: Option<Arc<dyn services::payment_gateway::PaymentGateway>>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config, gateway);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Storefront JSON API, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", handlers::products::products_routes())
        .nest("/categories", handlers::categories::categories_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/customers", handlers::customers::customers_routes())
        .nest("/payments", handlers::payments::payments_routes())
        .nest("/auth", handlers::auth::auth_routes())
}

/// Full application router with every layer but CORS, which depends on
/// deployment configuration and is added by the binary
pub fn app_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.config.uploads_path());
    let body_limit = state.config.max_upload_bytes;
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);
    let auth_service = state.services.auth.clone();

    Router::new()
        .route("/", get(|| async { "signage-storefront up" }))
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api", api_routes())
        .nest_service("/uploads", uploads)
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(DefaultBodyLimit::max(body_limit))
        // AuthService is read from request extensions by the auth middleware
        .layer(Extension(auth_service))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "signage-storefront",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "payments_configured": state.services.payments.is_configured(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = db::check_connection(&state.db).await.is_ok();
    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_healthy { "healthy" } else { "unhealthy" },
            "checks": {
                "database": if db_healthy { "healthy" } else { "unhealthy" },
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
