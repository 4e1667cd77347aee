use crate::entities::product::Category;
use crate::AppState;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

pub fn categories_routes() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    /// Value stored on products and accepted by the `category` filter
    pub id: Category,
    pub name: &'static str,
}

/// The fixed set of product categories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Product categories", body = [CategoryResponse])
    ),
    tag = "Products"
)]
pub async fn list_categories() -> Json<Vec<CategoryResponse>> {
    Json(
        Category::all()
            .into_iter()
            .map(|category| CategoryResponse {
                id: category,
                name: category.label(),
            })
            .collect(),
    )
}
