mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{body_json, TestApp};

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn status_reports_payment_configuration() {
    let app = TestApp::new().await;

    let body = body_json(app.request(Method::GET, "/status", None, None).await).await;
    assert_eq!(body["service"], "signage-storefront");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["payments_configured"], false);
}

#[tokio::test]
async fn categories_are_listed_in_navigation_order() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/categories", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let categories = body_json(response).await;
    let categories = categories.as_array().unwrap();

    assert_eq!(categories.len(), 8);
    assert_eq!(categories[0]["id"], "welcome");
    assert!(categories
        .iter()
        .all(|c| !c["name"].as_str().unwrap().is_empty()));
}

#[tokio::test]
async fn request_ids_are_echoed_or_generated() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .uri("/api/categories")
                .header("x-request-id", "checkout-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "checkout-42"
    );

    let response = app
        .request(Method::GET, "/api/products/not-a-uuid", None, None)
        .await;
    let generated = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(!generated.is_empty());
    assert_eq!(body_json(response).await["request_id"], generated.as_str());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "Signage Storefront API");
    assert!(doc["paths"].get("/api/orders/{id}/status").is_some());
}
