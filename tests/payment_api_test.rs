mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, line, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn intent(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "client_secret": format!("{id}_secret"),
        "amount": 15500,
        "currency": "usd",
        "status": status
    })
}

fn confirm_payload(intent_id: &str) -> Value {
    json!({
        "paymentIntentId": intent_id,
        "customer": {
            "name": "",
            "email": "card@example.com",
            "phone": "555-0199",
            "address": "9 Elm St"
        },
        "items": [line(&Uuid::new_v4().to_string(), "Welcome Sign", 60.0, 2)],
        "shipping": { "method": "fast" }
    })
}

async fn mock_retrieve(server: &MockServer, id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/payment_intents/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent(id, status)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_intent_charges_minor_units_of_display_currency() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=4140"))
        .and(body_string_contains("currency=eur"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent("pi_new", "requires_payment_method")))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_gateway(&server.uri()).await;
    let response = app
        .request(
            Method::POST,
            "/api/payments/create-intent",
            Some(json!({ "amount": 41.4, "currency": "EUR" })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["clientSecret"], "pi_new_secret");
    assert_eq!(body["paymentIntentId"], "pi_new");
}

#[tokio::test]
async fn create_intent_rejects_non_positive_amounts() {
    let server = MockServer::start().await;
    let app = TestApp::with_gateway(&server.uri()).await;

    let response = app
        .request(
            Method::POST,
            "/api/payments/create-intent",
            Some(json!({ "amount": 0 })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_rejections_surface_their_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "message": "Your card was declined." }
        })))
        .mount(&server)
        .await;

    let app = TestApp::with_gateway(&server.uri()).await;
    let response = app
        .request(
            Method::POST,
            "/api/payments/create-intent",
            Some(json!({ "amount": 10 })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body_json(response).await["message"], "Your card was declined.");
}

#[tokio::test]
async fn confirm_records_one_order_per_intent() {
    let server = MockServer::start().await;
    mock_retrieve(&server, "pi_paid", "succeeded").await;
    let app = TestApp::with_gateway(&server.uri()).await;

    let first = app
        .request(
            Method::POST,
            "/api/payments/confirm",
            Some(confirm_payload("pi_paid")),
            None,
        )
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_json(first).await;
    assert_eq!(first["success"], true);

    let order = &first["order"];
    assert_eq!(order["status"], "Processing");
    assert_eq!(order["paymentStatus"], "Complete");
    assert_eq!(order["paymentMethod"], "card");
    assert_eq!(order["paymentIntentId"], "pi_paid");
    assert_eq!(order["customer"]["name"], "card@example.com");
    assert_eq!(order["total"].as_f64(), Some(155.0));

    let replay = app
        .request(
            Method::POST,
            "/api/payments/confirm",
            Some(confirm_payload("pi_paid")),
            None,
        )
        .await;
    assert_eq!(replay.status(), StatusCode::OK);
    let replay = body_json(replay).await;
    assert_eq!(replay["order"]["id"], order["id"]);

    let orders = body_json(app.request_as_admin(Method::GET, "/api/orders", None).await).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn confirm_refuses_unfinished_payments() {
    let server = MockServer::start().await;
    mock_retrieve(&server, "pi_pending", "requires_action").await;
    let app = TestApp::with_gateway(&server.uri()).await;

    let response = app
        .request(
            Method::POST,
            "/api/payments/confirm",
            Some(confirm_payload("pi_pending")),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let orders = body_json(app.request_as_admin(Method::GET, "/api/orders", None).await).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn payments_answer_unavailable_without_gateway() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/payments/create-intent",
            Some(json!({ "amount": 10 })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await["message"],
        "Payment gateway is not configured"
    );

    let response = app
        .request(
            Method::POST,
            "/api/payments/confirm",
            Some(confirm_payload("pi_any")),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
