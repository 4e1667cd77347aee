use crate::{
    entities::order::{self, OrderStatus, PaymentStatus},
    errors::ServiceError,
    services::orders::OrderService,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, strum::Display)]
pub enum CustomerStatus {
    Active,
    Inactive,
}

/// Customer record aggregated from orders on every read
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub total_orders: u64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_spent: Decimal,
    pub last_order_at: DateTime<Utc>,
    pub status: CustomerStatus,
    /// Payment status of the most recent order
    pub payment_status: PaymentStatus,
}

/// Stable id derived from the normalised email address
pub fn customer_id(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!("CUST-{}", &hex::encode(digest)[..8].to_ascii_uppercase())
}

/// Groups orders by email into customer records, biggest spenders first
pub fn aggregate(orders: &[order::Model]) -> Vec<Customer> {
    let mut grouped: HashMap<String, Vec<&order::Model>> = HashMap::new();
    for order in orders {
        grouped
            .entry(order.email.trim().to_lowercase())
            .or_default()
            .push(order);
    }

    let mut customers: Vec<Customer> = grouped
        .into_iter()
        .filter_map(|(email, mut orders)| {
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let latest = *orders.first()?;

            let live: Vec<&&order::Model> = orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .collect();
            let total_spent: Decimal = live.iter().map(|o| o.total).sum();

            Some(Customer {
                id: customer_id(&email),
                customer_name: latest.customer_name.clone(),
                phone: latest.phone.clone(),
                location: latest.address.clone(),
                total_orders: orders.len() as u64,
                total_spent,
                last_order_at: latest.created_at,
                status: if live.is_empty() {
                    CustomerStatus::Inactive
                } else {
                    CustomerStatus::Active
                },
                payment_status: latest.payment_status,
                email,
            })
        })
        .collect();

    customers.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| b.last_order_at.cmp(&a.last_order_at))
    });
    customers
}

#[derive(Clone)]
pub struct CustomerService {
    orders: OrderService,
}

impl CustomerService {
    pub fn new(orders: OrderService) -> Self {
        Self { orders }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Customer>, ServiceError> {
        let customers = aggregate(&self.orders.list().await?);

        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        if needle.is_empty() {
            return Ok(customers);
        }

        Ok(customers
            .into_iter()
            .filter(|c| {
                c.customer_name.to_lowercase().contains(&needle)
                    || c.email.contains(&needle)
                    || c.id.to_lowercase().contains(&needle)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Customer, ServiceError> {
        let wanted = id.trim().to_ascii_uppercase();
        aggregate(&self.orders.list().await?)
            .into_iter()
            .find(|c| c.id == wanted)
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))
    }
}
