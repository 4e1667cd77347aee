use crate::handlers::{common::success_response, orders::OrderResponse};
use crate::{
    errors::ServiceError,
    services::payments::{ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse},
    AppState,
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// Creates the router for payment endpoints
pub fn payments_routes() -> Router<AppState> {
    Router::new()
        .route("/create-intent", post(create_payment_intent))
        .route("/confirm", post(confirm_payment))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub order: OrderResponse,
}

/// Open a card payment intent
#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = CreateIntentResponse),
        (status = 400, description = "Invalid amount or currency", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment gateway not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if payload.amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Amount must be greater than zero".to_string(),
        ));
    }
    let intent = state.services.payments.create_intent(payload).await?;
    Ok(success_response(intent))
}

/// Record the order for a succeeded payment
#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 201, description = "Order created for the payment", body = ConfirmPaymentResponse),
        (status = 200, description = "Payment was already confirmed; existing order returned", body = ConfirmPaymentResponse),
        (status = 400, description = "Missing fields or invalid items", body = crate::errors::ErrorResponse),
        (status = 402, description = "Payment has not completed", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment gateway not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let confirmed = state.services.payments.confirm(payload).await?;
    let status = if confirmed.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    info!(
        order_number = %confirmed.order.order_number,
        created = confirmed.created,
        "Payment confirmed"
    );
    Ok((
        status,
        Json(ConfirmPaymentResponse {
            success: true,
            order: OrderResponse::from(confirmed.order),
        }),
    ))
}
