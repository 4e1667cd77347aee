pub mod auth;
pub mod categories;
pub mod common;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;

use crate::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    services::{
        catalog::ProductCatalogService, customers::CustomerService, image_store::ImageStore,
        orders::OrderService, payment_gateway::PaymentGateway, payments::PaymentService,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub orders: Arc<OrderService>,
    pub customers: Arc<CustomerService>,
    pub payments: Arc<PaymentService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    /// Wires every service over one connection pool. Without a gateway the
    /// payment endpoints answer 503.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        let images = ImageStore::new(config.uploads_path());
        let orders = OrderService::new(db.clone());

        Self {
            catalog: Arc::new(ProductCatalogService::new(db.clone(), images)),
            customers: Arc::new(CustomerService::new(orders.clone())),
            payments: Arc::new(PaymentService::new(gateway, orders.clone())),
            orders: Arc::new(orders),
            auth: Arc::new(AuthService::new(AuthConfig::from_app_config(config), db)),
        }
    }
}
