use crate::{
    entities::product::{self, Category, Entity as Product, FeatureType, Variant},
    errors::ServiceError,
    services::{
        image_store::{ImageStore, UploadedImage},
        pricing::{display_price, format_currency, DisplayPrice, PricingConfig},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_PRODUCT_IMAGES: usize = 10;
pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Query options for the public product listing
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Category slug; `all` or absent means every category
    pub category: Option<String>,
    /// `Some(false)` includes inactive products, anything else lists active ones only
    pub active: Option<bool>,
    pub search: Option<String>,
}

/// Editable product fields shared by create and update
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub description: Option<String>,
    pub is_bestseller: bool,
    pub is_new: bool,
    pub features: Option<Vec<Variant>>,
    pub feature_type: Option<String>,
    pub stock: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub fields: ProductInput,
    pub active: Option<bool>,
    /// Replacement image list used when no new files are uploaded
    pub existing_images: Option<Vec<String>>,
}

struct ValidatedInput {
    name: String,
    category: Category,
    price: Decimal,
    original_price: Option<Decimal>,
    description: String,
    feature_type: FeatureType,
}

impl ProductInput {
    fn validate(&self) -> Result<ValidatedInput, ServiceError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name is required".to_string(),
            ));
        }
        let category = Category::from_str(self.category.trim())
            .map_err(|_| ServiceError::ValidationError("Invalid category".to_string()))?;
        if self.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must be a positive number".to_string(),
            ));
        }
        if matches!(self.original_price, Some(p) if p < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Original price must be a positive number".to_string(),
            ));
        }
        if matches!(self.stock, Some(s) if s < 0) {
            return Err(ServiceError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }
        if let Some(features) = &self.features {
            if features.iter().any(|v| v.price < Decimal::ZERO) {
                return Err(ServiceError::ValidationError(
                    "Variant prices must be positive numbers".to_string(),
                ));
            }
        }
        let feature_type = match self.feature_type.as_deref().map(str::trim) {
            None | Some("") => FeatureType::default(),
            Some(raw) => FeatureType::from_str(raw)
                .map_err(|_| ServiceError::ValidationError("Invalid feature type".to_string()))?,
        };

        Ok(ValidatedInput {
            name: name.to_string(),
            category,
            price: self.price,
            original_price: self.original_price,
            description: self.description.clone().unwrap_or_default(),
            feature_type,
        })
    }

    /// Headline price: the first variant's price when variants are supplied
    fn headline_price(&self) -> Decimal {
        self.features
            .as_ref()
            .and_then(|v| v.first())
            .map(|v| v.price)
            .unwrap_or(self.price)
    }
}

/// Price of a product (or one of its variants) in the shopper's currency
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub product_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub base_price: Decimal,
    pub currency: crate::services::pricing::Currency,
    #[serde(flatten)]
    pub display: DisplayPrice,
    pub final_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_formatted: Option<String>,
}

/// Picks the price for a (size, color) selection.
///
/// Exact variant match first, then the first variant with the size, then
/// the product's base price.
pub fn resolve_price(product: &product::Model, size: Option<&str>, color: Option<&str>) -> Decimal {
    let variants = product.variants();
    let Some(size) = size else {
        return product.price;
    };

    variants
        .iter()
        .find(|v| v.size == size && color.map_or(false, |c| v.color == c))
        .or_else(|| variants.iter().find(|v| v.size == size))
        .map(|v| v.price)
        .unwrap_or(product.price)
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ServiceError> {
    Ok(serde_json::to_value(value)?)
}

#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    images: ImageStore,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, images: ImageStore) -> Self {
        Self { db, images }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ProductFilter) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = Product::find();

        match filter.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => {}
            Some(raw) => match Category::from_str(raw) {
                Ok(category) => query = query.filter(product::Column::Category.eq(category)),
                Err(_) => return Ok(Vec::new()),
            },
        }

        if filter.active != Some(false) {
            query = query.filter(product::Column::Active.eq(true));
        }

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            let matches = |column: product::Column| {
                Expr::expr(Func::lower(Expr::col((Product, column))))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            query = query.filter(
                Condition::any()
                    .add(matches(product::Column::Name))
                    .add(matches(product::Column::Description)),
            );
        }

        let products = query
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()))
    }

    #[instrument(skip(self, input, uploads), fields(name = %input.name, uploads = uploads.len()))]
    pub async fn create(
        &self,
        input: ProductInput,
        uploads: Vec<UploadedImage>,
        base_url: &str,
    ) -> Result<product::Model, ServiceError> {
        let valid = input.validate()?;
        ensure_uploads(&uploads)?;

        let urls = self.images.save_all(&uploads, base_url).await?;
        if urls.is_empty() {
            info!("No image files provided");
        }

        let now = Utc::now();
        let features = input.features.clone().unwrap_or_default();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(valid.name),
            category: Set(valid.category),
            price: Set(input.headline_price()),
            original_price: Set(valid.original_price),
            description: Set(valid.description),
            image: Set(urls.first().cloned().unwrap_or_default()),
            images: Set(to_json(&urls)?),
            is_bestseller: Set(input.is_bestseller),
            is_new: Set(input.is_new),
            features: Set(to_json(&features)?),
            feature_type: Set(valid.feature_type),
            stock: Set(input.stock.unwrap_or(0)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&*self.db).await {
            Ok(product) => {
                info!(product_id = %product.id, "Product created");
                Ok(product)
            }
            Err(e) => {
                // Files written for a row that never landed are orphans
                self.images.delete_all(&urls).await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, update, uploads), fields(uploads = uploads.len()))]
    pub async fn update(
        &self,
        id: Uuid,
        update: ProductUpdate,
        uploads: Vec<UploadedImage>,
        base_url: &str,
    ) -> Result<product::Model, ServiceError> {
        let valid = update.fields.validate()?;
        ensure_uploads(&uploads)?;
        let existing = self.get(id).await?;

        let previous_stock = existing.stock;
        let mut image = existing.image.clone();
        let mut images = existing.image_list();
        let mut stale = Vec::new();
        let mut fresh = Vec::new();

        if !uploads.is_empty() {
            stale = if images.is_empty() {
                vec![existing.image.clone()]
            } else {
                images.clone()
            };
            fresh = self.images.save_all(&uploads, base_url).await?;
            images = fresh.clone();
            image = images.first().cloned().unwrap_or_default();
        } else if let Some(kept) = update.existing_images.filter(|list| !list.is_empty()) {
            image = kept[0].clone();
            images = kept;
            info!("Updated existing images: {} image(s)", images.len());
        }

        let mut model = existing.into_active_model();
        model.name = Set(valid.name);
        model.category = Set(valid.category);
        model.price = Set(update.fields.headline_price());
        model.original_price = Set(valid.original_price);
        model.description = Set(valid.description);
        model.is_bestseller = Set(update.fields.is_bestseller);
        model.is_new = Set(update.fields.is_new);
        model.feature_type = Set(valid.feature_type);
        model.stock = Set(update.fields.stock.unwrap_or(previous_stock));
        if let Some(active) = update.active {
            model.active = Set(active);
        }
        if let Some(features) = &update.fields.features {
            model.features = Set(to_json(features)?);
        }
        model.image = Set(image);
        model.images = Set(to_json(&images)?);
        model.updated_at = Set(Utc::now());

        let product = match model.update(&*self.db).await {
            Ok(product) => product,
            Err(e) => {
                self.images.delete_all(&fresh).await;
                return Err(e.into());
            }
        };
        // Old files go only once the row points at their replacements
        self.images.delete_all(&stale).await;
        info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Removes the product, then its primary image file if hosted locally
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        Product::delete_by_id(id).exec(&*self.db).await?;

        if !existing.image.is_empty() && !self.images.delete(&existing.image).await {
            warn!(product_id = %id, "Primary image was not removed from disk");
        }
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    #[instrument(skip(self, cfg))]
    pub async fn quote(
        &self,
        id: Uuid,
        size: Option<&str>,
        color: Option<&str>,
        cfg: &PricingConfig,
    ) -> Result<PriceQuote, ServiceError> {
        let product = self.get(id).await?;
        let base_price = resolve_price(&product, size, color);
        let display = display_price(base_price, product.original_price, cfg);

        Ok(PriceQuote {
            product_id: product.id,
            base_price,
            currency: cfg.currency,
            final_formatted: format_currency(display.final_price, cfg.currency),
            original_formatted: display
                .original
                .map(|amount| format_currency(amount, cfg.currency)),
            display,
        })
    }
}

/// Checks the whole batch before anything touches the disk
fn ensure_uploads(uploads: &[UploadedImage]) -> Result<(), ServiceError> {
    if uploads.len() > MAX_PRODUCT_IMAGES {
        return Err(ServiceError::ValidationError(format!(
            "A product can have at most {} images",
            MAX_PRODUCT_IMAGES
        )));
    }
    uploads.iter().try_for_each(UploadedImage::validate)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
