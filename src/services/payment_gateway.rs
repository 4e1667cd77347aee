use crate::{errors::ServiceError, services::pricing::Currency};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Intent state as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// Card payment provider seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: Currency,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ServiceError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    message: Option<String>,
}

/// Stripe PaymentIntents over the REST API
#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build payment client: {}", e))
            })?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base)
    }

    async fn read_intent(response: Response) -> Result<PaymentIntent, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<PaymentIntent>().await.map_err(|e| {
                ServiceError::ExternalServiceError(format!(
                    "Unexpected payment gateway response: {}",
                    e
                ))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GatewayErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| format!("Payment gateway returned {}", status));
        debug!(%status, %message, "Payment gateway rejected request");
        Err(ServiceError::PaymentFailed(message))
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        error!("Payment gateway request timed out");
        ServiceError::ExternalServiceError("Payment gateway timed out".to_string())
    } else {
        error!(error = %e, "Payment gateway request failed");
        ServiceError::ExternalServiceError(format!("Payment gateway unreachable: {}", e))
    }
}

fn validate_intent_id(intent_id: &str) -> Result<(), ServiceError> {
    let valid = !intent_id.is_empty()
        && intent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "Invalid payment intent id".to_string(),
        ))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, metadata))]
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: Currency,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ServiceError> {
        let mut form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.code_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        form.extend(
            metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value)),
        );

        let response = self
            .http
            .post(self.intents_url())
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_intent(response).await
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, ServiceError> {
        validate_intent_id(intent_id)?;

        let response = self
            .http
            .get(format!("{}/{}", self.intents_url(), intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_intent(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new("sk_test_123", server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn creates_intent_with_form_encoded_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("amount=12450"))
            .and(body_string_contains("currency=eur"))
            .and(body_string_contains("metadata%5Bsource%5D=storefront"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "client_secret": "pi_123_secret_abc",
                "amount": 12450,
                "currency": "eur",
                "status": "requires_payment_method"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = BTreeMap::from([("source".to_string(), "storefront".to_string())]);
        let intent = gateway(&server)
            .create_intent(12_450, Currency::Eur, metadata)
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
        assert!(!intent.is_succeeded());
    }

    #[tokio::test]
    async fn gateway_error_message_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {"type": "card_error", "message": "Your card was declined."}
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .create_intent(1000, Currency::Usd, BTreeMap::new())
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::PaymentFailed(ref m) if m == "Your card was declined.");
    }

    #[tokio::test]
    async fn retrieves_intent_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_456",
                "amount": 500,
                "currency": "usd",
                "status": "succeeded"
            })))
            .mount(&server)
            .await;

        let intent = gateway(&server).retrieve_intent("pi_456").await.unwrap();
        assert!(intent.is_succeeded());
    }

    #[tokio::test]
    async fn rejects_path_like_intent_ids() {
        let server = MockServer::start().await;
        let err = gateway(&server)
            .retrieve_intent("../customers")
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[tokio::test]
    async fn slow_gateway_maps_to_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let slow = StripeGateway::new("sk_test", server.uri(), Duration::from_millis(50)).unwrap();
        let err = slow.retrieve_intent("pi_slow").await.unwrap_err();
        assert_matches!(err, ServiceError::ExternalServiceError(_));
    }
}
