use crate::auth::{AuthRouterExt, ADMIN_ROLE};
use crate::handlers::common::success_response;
use crate::{errors::ServiceError, services::customers::Customer, AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Creates the router for the admin customer view
pub fn customers_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/:id", get(get_customer))
        .with_role(ADMIN_ROLE)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerSearchParams {
    /// Case-insensitive match on name, email or customer id
    pub search: Option<String>,
}

/// List customers derived from orders
#[utoipa::path(
    get,
    path = "/api/customers",
    params(CustomerSearchParams),
    responses(
        (status = 200, description = "Customers, biggest spenders first", body = [Customer]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("Bearer" = [])),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<CustomerSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let customers = state
        .services
        .customers
        .list(params.search.as_deref())
        .await?;
    Ok(success_response(customers))
}

/// Get one derived customer
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    params(
        ("id" = String, Path, description = "Customer ID (CUST-XXXXXXXX)")
    ),
    responses(
        (status = 200, description = "Customer retrieved", body = Customer),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get(&id).await?;
    Ok(success_response(customer))
}
