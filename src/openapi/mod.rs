use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Signage Storefront API",
        version = "0.1.0",
        description = r#"
# Signage Storefront API

Catalog, checkout and order administration for a custom event-signage shop.

## Authentication

Admin endpoints require a bearer token from `/api/auth/login` for an account with the `admin` role:

```
Authorization: Bearer <your-jwt-token>
```

## Money

Amounts are in the canonical store currency (USD). Display currencies and storewide
discounts are applied by `/api/products/{id}/quote` and by the storefront; orders are
always priced from their line items on the server.

## Error Handling

```json
{
  "error": "Bad Request",
  "message": "Please fill all required fields.",
  "request_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Authentication failures use `{"error": {"code": "AUTH_INVALID_TOKEN", "message": "..."}}`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Order placement and administration"),
        (name = "Customers", description = "Customer view derived from orders"),
        (name = "Payments", description = "Card payment intents and confirmation"),
        (name = "Auth", description = "Accounts and tokens")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::quote_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::categories::list_categories,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,

        // Customers
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,

        // Payments
        crate::handlers::payments::create_payment_intent,
        crate::handlers::payments::confirm_payment,

        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
    ),
    components(
        schemas(
            crate::handlers::products::ProductResponse,
            crate::handlers::products::MessageResponse,
            crate::handlers::categories::CategoryResponse,
            crate::entities::product::Category,
            crate::entities::product::FeatureType,
            crate::entities::product::Variant,
            crate::services::catalog::PriceQuote,
            crate::services::pricing::Currency,
            crate::services::pricing::DisplayPrice,

            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::CreateOrderRequest,
            crate::entities::order::OrderItem,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentStatus,
            crate::services::orders::BillingForm,
            crate::services::orders::ShippingSelection,
            crate::services::orders::ShippingChoice,
            crate::services::orders::StatusUpdate,

            crate::services::customers::Customer,

            crate::services::payments::CreateIntentRequest,
            crate::services::payments::CreateIntentResponse,
            crate::services::payments::ConfirmPaymentRequest,
            crate::handlers::payments::ConfirmPaymentResponse,

            crate::auth::RegisterRequest,
            crate::auth::LoginRequest,
            crate::auth::AuthResponse,
            crate::auth::UserView,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
