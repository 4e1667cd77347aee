use crate::{
    entities::order::{
        self, Entity as Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    },
    errors::ServiceError,
    services::order_status::ensure_transition,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill all required fields.";
pub const EMPTY_ORDER_MESSAGE: &str = "Order must contain at least one item";
pub const ORDER_NOT_FOUND: &str = "Order not found";

/// Shipping options offered at checkout; the cost is always derived here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShippingChoice {
    #[default]
    #[serde(alias = "Free Shipping")]
    Free,
    #[serde(alias = "Fast Delivery", alias = "Fast Shipping")]
    Fast,
}

impl ShippingChoice {
    pub fn label(self) -> &'static str {
        match self {
            ShippingChoice::Free => "Free Shipping",
            ShippingChoice::Fast => "Fast Delivery",
        }
    }

    /// Cost in canonical units
    pub fn cost(self) -> Decimal {
        match self {
            ShippingChoice::Free => Decimal::ZERO,
            ShippingChoice::Fast => dec!(35),
        }
    }
}

/// Shipping block as the storefront submits it; any client-side cost is ignored
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct ShippingSelection {
    #[serde(default)]
    pub method: ShippingChoice,
}

/// Customer contact and delivery details from the checkout form
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl BillingForm {
    /// Checks the required fields; the form's own name is kept as typed
    pub fn validate(&self) -> Result<(), ServiceError> {
        let required = [&self.name, &self.email, &self.phone, &self.address];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                REQUIRED_FIELDS_MESSAGE.to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(ServiceError::ValidationError(
                "Please enter a valid email address.".to_string(),
            ));
        }
        Ok(())
    }

    /// `address[, city][, country]`, skipping parts the address already carries
    pub fn composed_address(&self) -> String {
        let mut composed = self.address.trim().to_string();
        for part in [&self.city, &self.country].into_iter().flatten() {
            let part = part.trim();
            if part.is_empty() || composed.contains(&format!(", {}", part)) {
                continue;
            }
            composed.push_str(", ");
            composed.push_str(part);
        }
        composed
    }
}

/// How the order came to be, which fixes its initial statuses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOrigin {
    /// Placed without a confirmed payment
    Manual,
    /// Placed after the gateway reported the intent as succeeded
    CardPayment { intent_id: String },
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub billing: BillingForm,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingChoice,
    pub origin: OrderOrigin,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

fn validate_items(items: &[OrderItem]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            EMPTY_ORDER_MESSAGE.to_string(),
        ));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for '{}' must be at least 1",
                item.name
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Price for '{}' cannot be negative",
                item.name
            )));
        }
    }
    Ok(())
}

/// Canonical subtotal of the order lines
pub fn subtotal(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::line_total).sum()
}

fn generate_order_number() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("SGN-{}", hex[..8].to_ascii_uppercase())
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Validates the checkout payload and persists one order.
    ///
    /// Totals are computed from the canonical item prices; whatever total
    /// the client displayed is not consulted.
    #[instrument(skip(self, request), fields(items = request.items.len(), origin = ?request.origin))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<order::Model, ServiceError> {
        let PlaceOrder {
            mut billing,
            items,
            shipping,
            origin,
        } = request;

        if matches!(origin, OrderOrigin::CardPayment { .. }) && billing.name.trim().is_empty() {
            billing.name = billing.email.clone();
        }
        billing.validate()?;
        validate_items(&items)?;

        let subtotal = subtotal(&items);
        let shipping_cost = shipping.cost();
        let total = subtotal + shipping_cost;

        let (status, payment_status, payment_method, payment_intent_id) = match origin {
            OrderOrigin::Manual => (
                OrderStatus::Pending,
                PaymentStatus::Pending,
                PaymentMethod::Manual,
                None,
            ),
            OrderOrigin::CardPayment { intent_id } => (
                OrderStatus::Processing,
                PaymentStatus::Complete,
                PaymentMethod::Card,
                Some(intent_id),
            ),
        };

        let now = Utc::now();
        let model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(generate_order_number()),
            customer_name: Set(billing.name.trim().to_string()),
            email: Set(billing.email.trim().to_string()),
            phone: Set(billing.phone.trim().to_string()),
            address: Set(billing.composed_address()),
            items: Set(serde_json::to_value(&items)?),
            subtotal: Set(subtotal),
            shipping_method: Set(shipping.label().to_string()),
            shipping_cost: Set(shipping_cost),
            total: Set(total),
            status: Set(status),
            payment_status: Set(payment_status),
            payment_method: Set(payment_method),
            payment_intent_id: Set(payment_intent_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let order = model.insert(&*self.db).await?;
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "Order placed"
        );
        Ok(order)
    }

    /// All orders, newest first
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<order::Model>, ServiceError> {
        let orders = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn find_by_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = Order::find()
            .filter(order::Column::PaymentIntentId.eq(intent_id))
            .one(&*self.db)
            .await?;
        Ok(order)
    }

    /// Applies an admin status and/or payment-status change
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<order::Model, ServiceError> {
        if update.status.is_none() && update.payment_status.is_none() {
            return Err(ServiceError::ValidationError(
                "Provide a status or paymentStatus to update".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let existing = Order::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.to_string()))?;

        let old_status = existing.status;
        if let Some(new_status) = update.status {
            ensure_transition(old_status, new_status)?;
        }

        let mut active = existing.into_active_model();
        if let Some(new_status) = update.status {
            active.status = Set(new_status);
        }
        if let Some(payment_status) = update.payment_status {
            active.payment_status = Set(payment_status);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            order_id = %id,
            from = %old_status,
            to = %updated.status,
            payment_status = %updated.payment_status,
            "Order status updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> BillingForm {
        BillingForm {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
            address: "12 Analytical Way".into(),
            city: Some("London".into()),
            country: Some("UK".into()),
        }
    }

    #[test]
    fn composes_address_with_optional_parts() {
        assert_eq!(form().composed_address(), "12 Analytical Way, London, UK");

        let mut partial = form();
        partial.city = Some("  ".into());
        assert_eq!(partial.composed_address(), "12 Analytical Way, UK");

        let mut precomposed = form();
        precomposed.address = "12 Analytical Way, London, UK".into();
        assert_eq!(precomposed.composed_address(), "12 Analytical Way, London, UK");
    }

    #[test]
    fn missing_required_fields_rejected() {
        let mut missing_phone = form();
        missing_phone.phone = " ".into();
        let err = missing_phone.validate().unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref m) if m == REQUIRED_FIELDS_MESSAGE));

        let mut bad_email = form();
        bad_email.email = "ada.example.com".into();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn shipping_labels_and_costs() {
        assert_eq!(ShippingChoice::Free.cost(), Decimal::ZERO);
        assert_eq!(ShippingChoice::Fast.cost(), dec!(35));
        let parsed: ShippingSelection =
            serde_json::from_str(r#"{"method":"Fast Delivery","cost":9999}"#).unwrap();
        assert_eq!(parsed.method, ShippingChoice::Fast);
    }

    #[test]
    fn order_numbers_are_prefixed_upper_hex() {
        let number = generate_order_number();
        assert_eq!(number.len(), 12);
        assert!(number.starts_with("SGN-"));
        assert!(number[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_items_rejected() {
        let err = validate_items(&[]).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref m) if m == EMPTY_ORDER_MESSAGE));
    }
}
