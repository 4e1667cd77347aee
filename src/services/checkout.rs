//! Storefront checkout sequence, from the billing form to a persisted order.
//!
//! The browser drives these steps against the HTTP API; modelling them here
//! lets the same sequence run in-process against [`PaymentService`] or
//! against mocks.
//!
//! [`PaymentService`]: crate::services::payments::PaymentService

use crate::{
    entities::order,
    errors::ServiceError,
    services::{
        cart::Cart,
        orders::{BillingForm, ShippingChoice, ShippingSelection},
        payments::{ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse},
        pricing::{convert, round_money, PricingConfig},
    },
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

pub const PAYPAL_UNAVAILABLE_MESSAGE: &str =
    "PayPal integration coming soon. Please use card payment for now.";
pub const ORDER_FAILED_MESSAGE: &str = "Failed to place order. Please try again.";

/// Server-side payment endpoints the checkout talks to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ServiceError>;

    async fn confirm(&self, request: ConfirmPaymentRequest) -> Result<order::Model, ServiceError>;
}

/// Client-side card widget; resolves with the intent status or the
/// gateway's error message
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardConfirmer: Send + Sync {
    async fn confirm_card(&self, client_secret: &str) -> Result<String, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethodChoice {
    #[default]
    Card,
    PayPal,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub billing: BillingForm,
    pub payment_method: PaymentMethodChoice,
    pub shipping: ShippingChoice,
}

/// User-facing checkout failures
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Failed to place order. Please try again.")]
    OrderFailed(#[source] ServiceError),
}

fn payment_failure(err: ServiceError) -> CheckoutError {
    CheckoutError::PaymentFailed(err.response_message())
}

pub struct CheckoutFlow<P, C> {
    payments: P,
    card: C,
}

impl<P: PaymentsApi, C: CardConfirmer> CheckoutFlow<P, C> {
    pub fn new(payments: P, card: C) -> Self {
        Self { payments, card }
    }

    /// Runs one checkout attempt for the cart's selected lines.
    ///
    /// Nothing is persisted and the cart is untouched unless every step
    /// succeeds; on success the checked-out lines leave the cart.
    #[instrument(skip_all, fields(method = ?form.payment_method, currency = %cfg.currency))]
    pub async fn submit(
        &self,
        cart: &mut Cart,
        form: CheckoutForm,
        cfg: &PricingConfig,
    ) -> Result<order::Model, CheckoutError> {
        let billing = form.billing;
        billing.validate().map_err(|e| CheckoutError::Validation(e.response_message()))?;

        let selection = cart
            .checkout_selection()
            .map_err(|e| CheckoutError::Validation(e.response_message()))?;

        if form.payment_method == PaymentMethodChoice::PayPal {
            return Err(CheckoutError::Unavailable(
                PAYPAL_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }

        // The gateway charges in the display currency; persisted totals stay canonical
        let display_total =
            round_money(cart.compute_total(cfg) + convert(form.shipping.cost(), cfg.currency));

        let intent = self
            .payments
            .create_intent(CreateIntentRequest {
                amount: display_total,
                currency: Some(cfg.currency.to_string()),
                metadata: BTreeMap::from([
                    ("customer_email".to_string(), billing.email.trim().to_string()),
                    ("items".to_string(), selection.len().to_string()),
                ]),
            })
            .await
            .map_err(payment_failure)?;

        let status = self
            .card
            .confirm_card(&intent.client_secret)
            .await
            .map_err(CheckoutError::PaymentFailed)?;
        if status != "succeeded" {
            warn!(%status, "Card confirmation did not succeed");
            return Err(CheckoutError::PaymentFailed(format!(
                "Payment has not completed (status: {})",
                status
            )));
        }

        let order = self
            .payments
            .confirm(ConfirmPaymentRequest {
                payment_intent_id: intent.payment_intent_id,
                customer: billing,
                items: selection.iter().map(|line| line.to_order_item()).collect(),
                shipping: ShippingSelection {
                    method: form.shipping,
                },
            })
            .await
            .map_err(CheckoutError::OrderFailed)?;

        cart.clear_checked_out();
        info!(order_number = %order.order_number, "Checkout completed");
        Ok(order)
    }
}
