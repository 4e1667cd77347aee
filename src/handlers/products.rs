use crate::auth::{AuthRouterExt, ADMIN_ROLE};
use crate::entities::product::{self, Category, FeatureType, Variant};
use crate::handlers::common::{
    created_response, map_service_error, parse_decimal, parse_flag, parse_id, parse_json_field,
    parse_optional_decimal, parse_optional_i32, success_response,
};
use crate::{
    errors::{ApiError, ServiceError},
    services::{
        catalog::{PriceQuote, ProductFilter, ProductInput, ProductUpdate, PRODUCT_NOT_FOUND},
        image_store::{public_base_url, UploadedImage},
        settings::StorefrontSettings,
    },
    AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_product))
        .route("/:id", axum::routing::put(update_product).delete(delete_product))
        .with_role(ADMIN_ROLE);

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/quote", get(quote_product))
        .merge(protected)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    #[schema(value_type = Option<f64>)]
    pub original_price: Option<Decimal>,
    pub description: String,
    pub image: String,
    pub images: Vec<String>,
    pub is_bestseller: bool,
    pub is_new: bool,
    pub features: Vec<Variant>,
    pub feature_type: FeatureType,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            images: model.image_list(),
            features: model.variants(),
            id: model.id,
            name: model.name,
            category: model.category,
            price: model.price,
            original_price: model.original_price,
            description: model.description,
            image: model.image,
            is_bestseller: model.is_bestseller,
            is_new: model.is_new,
            feature_type: model.feature_type,
            stock: model.stock,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Category slug or `all`
    pub category: Option<String>,
    /// Case-insensitive match on name and description
    pub search: Option<String>,
    /// `false` includes inactive products; any other value lists active ones only
    pub active: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteParams {
    pub size: Option<String>,
    pub color: Option<String>,
    /// Display currency code (USD, EUR, GBP, INR)
    pub currency: Option<String>,
    /// Storewide discount percentage, 0 to 90
    pub discount: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Multipart product form as sent by the admin console
#[derive(Debug, Default)]
struct ProductForm {
    input: ProductInput,
    price: Option<Decimal>,
    active: Option<bool>,
    existing_images: Option<Vec<String>>,
    uploads: Vec<UploadedImage>,
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::ValidationError(format!("Invalid form data: {}", err))
}

async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "images" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.uploads.push(UploadedImage {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "name" => form.input.name = value,
            "category" => form.input.category = value,
            "price" => {
                if !value.trim().is_empty() {
                    form.price = Some(parse_decimal(&value, "price")?);
                }
            }
            "originalPrice" => {
                form.input.original_price = parse_optional_decimal(&value, "originalPrice")?
            }
            "description" => form.input.description = Some(value),
            "isBestseller" => form.input.is_bestseller = parse_flag(&value),
            "isNew" => form.input.is_new = parse_flag(&value),
            "features" => form.input.features = parse_json_field(&value, "features")?,
            "featureType" => {
                form.input.feature_type = Some(value).filter(|v| !v.trim().is_empty())
            }
            "stock" => form.input.stock = parse_optional_i32(&value, "stock")?,
            "active" => form.active = Some(parse_flag(&value)),
            "existingImages" => {
                form.existing_images = parse_json_field(&value, "existingImages")?
            }
            other => debug!(field = other, "Ignoring unknown product form field"),
        }
    }

    let has_variants = form
        .input
        .features
        .as_ref()
        .map_or(false, |variants| !variants.is_empty());
    form.input.price = match form.price {
        Some(price) => price,
        None if has_variants => Decimal::ZERO,
        None => return Err(ApiError::ValidationError("Price is required".to_string())),
    };

    Ok(form)
}

/// List products
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Products, newest first", body = [ProductResponse])
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state
        .services
        .catalog
        .list(ProductFilter {
            category: params.category,
            active: params.active.map(|raw| raw != "false"),
            search: params.search,
        })
        .await?;

    Ok(success_response(
        products
            .into_iter()
            .map(ProductResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product retrieved", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, PRODUCT_NOT_FOUND)?;
    let product = state.services.catalog.get(id).await?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Price a product selection in the shopper's currency
#[utoipa::path(
    get,
    path = "/api/products/{id}/quote",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        QuoteParams
    ),
    responses(
        (status = 200, description = "Resolved and display price", body = PriceQuote),
        (status = 400, description = "Unknown currency or discount out of range", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn quote_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<QuoteParams>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, PRODUCT_NOT_FOUND)?;
    let discount = params
        .discount
        .as_deref()
        .map(|raw| parse_optional_decimal(raw, "discount"))
        .transpose()?
        .flatten();
    let settings = StorefrontSettings::from_parts(params.currency.as_deref(), discount)?;
    let cfg = settings.pricing_config()?;

    let quote = state
        .services
        .catalog
        .quote(id, params.size.as_deref(), params.color.as_deref(), &cfg)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(quote))
}

/// Create a product from a multipart form
#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content_type = "multipart/form-data", description = "Product fields plus up to 10 `images` file parts"),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_product_form(multipart).await?;
    let base_url = public_base_url(&headers, state.config.port);

    let product = state
        .services
        .catalog
        .create(form.input, form.uploads, &base_url)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProductResponse::from(product)))
}

/// Replace a product's fields, optionally with new images
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content_type = "multipart/form-data", description = "Product fields, `existingImages` JSON and optional `images` file parts"),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, PRODUCT_NOT_FOUND)?;
    let form = read_product_form(multipart).await?;
    let base_url = public_base_url(&headers, state.config.port);

    let update = ProductUpdate {
        fields: form.input,
        active: form.active,
        existing_images: form.existing_images,
    };
    let product = state
        .services
        .catalog
        .update(id, update, form.uploads, &base_url)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, PRODUCT_NOT_FOUND)?;
    state.services.catalog.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Product deleted successfully".to_string(),
    }))
}
