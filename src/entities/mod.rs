pub mod order;
pub mod product;

pub use order::{OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
pub use product::{Category, FeatureType, Variant};
