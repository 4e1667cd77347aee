// Pure pricing and client-side state
pub mod cart;
pub mod pricing;
pub mod settings;

// Catalog and uploads
pub mod catalog;
pub mod image_store;

// Orders and the views derived from them
pub mod customers;
pub mod order_status;
pub mod orders;

// Payments and checkout
pub mod checkout;
pub mod payment_gateway;
pub mod payments;
