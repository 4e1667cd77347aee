use crate::{
    entities::order::{self, OrderItem},
    errors::ServiceError,
    services::{
        checkout::PaymentsApi,
        orders::{BillingForm, OrderOrigin, OrderService, PlaceOrder, ShippingSelection},
        payment_gateway::PaymentGateway,
        pricing::{to_minor_units, Currency},
    },
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

pub const GATEWAY_NOT_CONFIGURED: &str = "Payment gateway is not configured";

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Amount in the display currency
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

/// Checkout payload sent once the card widget reports success
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
    pub customer: BillingForm,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping: ShippingSelection,
}

/// Order backing a confirmed intent, and whether this call created it
#[derive(Debug, Clone)]
pub struct ConfirmedOrder {
    pub order: order::Model,
    pub created: bool,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    orders: OrderService,
}

impl PaymentService {
    pub fn new(gateway: Option<Arc<dyn PaymentGateway>>, orders: OrderService) -> Self {
        Self { gateway, orders }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, ServiceError> {
        self.gateway
            .as_ref()
            .ok_or_else(|| ServiceError::ServiceUnavailable(GATEWAY_NOT_CONFIGURED.to_string()))
    }

    /// Opens a gateway intent for an amount already in the display currency
    #[instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ServiceError> {
        let gateway = self.gateway()?;
        let currency = match request.currency.as_deref() {
            Some(code) if !code.trim().is_empty() => Currency::parse(code)?,
            _ => Currency::default(),
        };
        let amount_minor = to_minor_units(request.amount)?;

        let intent = gateway
            .create_intent(amount_minor, currency, request.metadata)
            .await?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            ServiceError::ExternalServiceError(
                "Payment gateway did not return a client secret".to_string(),
            )
        })?;

        info!(payment_intent_id = %intent.id, amount_minor, %currency, "Payment intent created");
        Ok(CreateIntentResponse {
            client_secret,
            payment_intent_id: intent.id,
        })
    }

    /// Persists the order for a succeeded intent, at most once per intent
    #[instrument(skip(self, request), fields(payment_intent_id = %request.payment_intent_id))]
    pub async fn confirm(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<ConfirmedOrder, ServiceError> {
        let gateway = self.gateway()?;
        let intent_id = request.payment_intent_id.trim().to_string();
        if intent_id.is_empty() {
            return Err(ServiceError::ValidationError(
                "Payment intent id is required".to_string(),
            ));
        }

        let intent = gateway.retrieve_intent(&intent_id).await?;
        if !intent.is_succeeded() {
            return Err(ServiceError::PaymentFailed(format!(
                "Payment has not completed (status: {})",
                intent.status
            )));
        }

        if let Some(order) = self.orders.find_by_payment_intent(&intent_id).await? {
            info!(order_id = %order.id, "Payment already confirmed, returning existing order");
            return Ok(ConfirmedOrder {
                order,
                created: false,
            });
        }

        let placed = self
            .orders
            .place_order(PlaceOrder {
                billing: request.customer,
                items: request.items,
                shipping: request.shipping.method,
                origin: OrderOrigin::CardPayment {
                    intent_id: intent_id.clone(),
                },
            })
            .await;

        match placed {
            Ok(order) => Ok(ConfirmedOrder {
                order,
                created: true,
            }),
            // A concurrent confirm may have won the unique index on the intent id
            Err(ServiceError::DatabaseError(e)) => {
                match self.orders.find_by_payment_intent(&intent_id).await? {
                    Some(order) => {
                        warn!(order_id = %order.id, "Concurrent confirmation detected");
                        Ok(ConfirmedOrder {
                            order,
                            created: false,
                        })
                    }
                    None => Err(ServiceError::DatabaseError(e)),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl PaymentsApi for PaymentService {
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ServiceError> {
        PaymentService::create_intent(self, request).await
    }

    async fn confirm(&self, request: ConfirmPaymentRequest) -> Result<order::Model, ServiceError> {
        PaymentService::confirm(self, request)
            .await
            .map(|confirmed| confirmed.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::order::{OrderStatus, PaymentStatus};
    use crate::services::payment_gateway::{MockPaymentGateway, PaymentIntent};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    async fn orders() -> OrderService {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("sqlite connection");
        run_migrations(&pool).await.expect("migrations apply");
        OrderService::new(Arc::new(pool))
    }

    fn intent(id: &str, status: &str) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            client_secret: Some(format!("{}_secret", id)),
            amount: 9000,
            currency: "usd".to_string(),
            status: status.to_string(),
        }
    }

    fn confirm_request(intent_id: &str) -> ConfirmPaymentRequest {
        ConfirmPaymentRequest {
            payment_intent_id: intent_id.to_string(),
            customer: BillingForm {
                name: "Grace Hopper".into(),
                email: "grace@example.com".into(),
                phone: "555-0142".into(),
                address: "7 Harbor Rd".into(),
                city: None,
                country: None,
            },
            items: vec![OrderItem {
                product_id: Uuid::new_v4(),
                name: "Seating Chart".into(),
                price: dec!(90),
                quantity: 1,
                selected_size: Some("A2".into()),
                selected_color: None,
                customization: None,
            }],
            shipping: ShippingSelection::default(),
        }
    }

    #[tokio::test]
    async fn create_intent_converts_to_minor_units() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_intent()
            .withf(|amount, currency, _| *amount == 8280 && *currency == Currency::Eur)
            .times(1)
            .returning(|_, _, _| Ok(intent("pi_eur", "requires_payment_method")));

        let service = PaymentService::new(Some(Arc::new(gateway)), orders().await);
        let response = service
            .create_intent(CreateIntentRequest {
                amount: dec!(82.80),
                currency: Some("eur".into()),
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap();

        assert_eq!(response.payment_intent_id, "pi_eur");
        assert_eq!(response.client_secret, "pi_eur_secret");
    }

    #[tokio::test]
    async fn unknown_currency_is_rejected_before_calling_gateway() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_intent().never();

        let service = PaymentService::new(Some(Arc::new(gateway)), orders().await);
        let err = service
            .create_intent(CreateIntentRequest {
                amount: dec!(10),
                currency: Some("JPY".into()),
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[tokio::test]
    async fn confirm_is_idempotent_per_intent() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_intent()
            .times(2)
            .returning(|id| Ok(intent(id, "succeeded")));

        let service = PaymentService::new(Some(Arc::new(gateway)), orders().await);

        let first = service.confirm(confirm_request("pi_once")).await.unwrap();
        assert!(first.created);
        assert_eq!(first.order.status, OrderStatus::Processing);
        assert_eq!(first.order.payment_status, PaymentStatus::Complete);
        assert_eq!(first.order.payment_intent_id.as_deref(), Some("pi_once"));
        assert_eq!(first.order.total, dec!(90));

        let second = service.confirm(confirm_request("pi_once")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.order.id, first.order.id);
    }

    #[tokio::test]
    async fn unfinished_intent_is_not_recorded() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_intent()
            .returning(|id| Ok(intent(id, "processing")));

        let orders = orders().await;
        let service = PaymentService::new(Some(Arc::new(gateway)), orders.clone());

        let err = service.confirm(confirm_request("pi_wait")).await.unwrap_err();
        assert_matches!(err, ServiceError::PaymentFailed(ref m) if m.contains("processing"));
        assert!(orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_gateway_is_unavailable() {
        let service = PaymentService::new(None, orders().await);
        assert!(!service.is_configured());

        let err = service.confirm(confirm_request("pi_x")).await.unwrap_err();
        assert_matches!(err, ServiceError::ServiceUnavailable(ref m) if m == GATEWAY_NOT_CONFIGURED);
    }
}
