use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog product as stored in the `products` table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub original_price: Option<Decimal>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Primary image URL; empty when the product has no images
    pub image: String,
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    pub is_bestseller: bool,
    pub is_new: bool,
    /// Variant table (`[{size, color, price}]`)
    #[sea_orm(column_type = "Json")]
    pub features: Json,
    pub feature_type: FeatureType,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decoded image URL list; malformed JSON reads as empty
    pub fn image_list(&self) -> Vec<String> {
        serde_json::from_value(self.images.clone()).unwrap_or_default()
    }

    /// Decoded variant table; malformed JSON reads as empty
    pub fn variants(&self) -> Vec<Variant> {
        serde_json::from_value(self.features.clone()).unwrap_or_default()
    }
}

/// Storefront category a product is listed under
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    #[sea_orm(string_value = "welcome")]
    Welcome,
    #[sea_orm(string_value = "seating")]
    Seating,
    #[sea_orm(string_value = "bar")]
    Bar,
    #[sea_orm(string_value = "menucards")]
    MenuCards,
    #[sea_orm(string_value = "placecards")]
    PlaceCards,
    #[sea_orm(string_value = "thankyou")]
    ThankYou,
    #[sea_orm(string_value = "tabledecor")]
    TableDecor,
    #[sea_orm(string_value = "tablenumbers")]
    TableNumbers,
}

impl Category {
    pub fn all() -> Vec<Category> {
        Category::iter().collect()
    }

    /// Human label used by the storefront navigation
    pub fn label(self) -> &'static str {
        match self {
            Category::Welcome => "Welcome Signs",
            Category::Seating => "Seating Charts",
            Category::Bar => "Bar Signs",
            Category::MenuCards => "Menu Cards",
            Category::PlaceCards => "Place Cards",
            Category::ThankYou => "Thank You Signs",
            Category::TableDecor => "Table Decor",
            Category::TableNumbers => "Table Numbers",
        }
    }
}

/// What the variant's `size` column means to the shopper
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeatureType {
    #[default]
    #[sea_orm(string_value = "size")]
    Size,
    #[sea_orm(string_value = "number")]
    Number,
}

/// One priced (size, color) combination of a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
}
