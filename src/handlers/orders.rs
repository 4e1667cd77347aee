use crate::auth::{AuthRouterExt, ADMIN_ROLE};
use crate::entities::order::{self, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
use crate::handlers::common::{created_response, parse_id, success_response};
use crate::{
    errors::ServiceError,
    services::orders::{
        BillingForm, OrderOrigin, PlaceOrder, ShippingSelection, StatusUpdate, ORDER_NOT_FOUND,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_order_status))
        .with_role(ADMIN_ROLE);

    Router::new().route("/", post(create_order)).merge(admin)
}

/// Contact block of an order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderShipping {
    pub method: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    /// Human-facing order number
    pub order_id: String,
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
    pub shipping: OrderShipping,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            items: model.item_list(),
            id: model.id,
            order_id: model.order_number,
            customer: OrderCustomer {
                name: model.customer_name,
                email: model.email,
                phone: model.phone,
                address: model.address,
            },
            subtotal: model.subtotal,
            shipping: OrderShipping {
                method: model.shipping_method,
                cost: model.shipping_cost,
            },
            total: model.total,
            status: model.status,
            payment_status: model.payment_status,
            payment_method: model.payment_method,
            payment_intent_id: model.payment_intent_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Order placed without going through the card gateway.
///
/// Totals and statuses sent by the client are ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer: BillingForm,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping: ShippingSelection,
}

/// Place an order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Missing fields or invalid items", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .place_order(PlaceOrder {
            billing: payload.customer,
            items: payload.items,
            shipping: payload.shipping.method,
            origin: OrderOrigin::Manual,
        })
        .await?;

    info!(order_number = %order.order_number, "Manual order placed");
    Ok(created_response(OrderResponse::from(order)))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Orders, newest first", body = [OrderResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.list().await?;
    Ok(success_response(
        orders
            .into_iter()
            .map(OrderResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order retrieved", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, ORDER_NOT_FOUND)?;
    let order = state.services.orders.get(id).await?;
    Ok(success_response(OrderResponse::from(order)))
}

/// Move an order through its lifecycle or mark it paid
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, ORDER_NOT_FOUND)?;
    let order = state.services.orders.update_status(id, payload).await?;
    Ok(success_response(OrderResponse::from(order)))
}
