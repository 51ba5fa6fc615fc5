//! Paystack REST client
//!
//! Thin wrapper over `/transaction/initialize` and `/transaction/verify`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::PaymentGateway;
use crate::config::PaystackConfig;
use crate::error::{PaymentError, Result};
use crate::transaction::{InitializeTransaction, InitializedTransaction, Reference, VerifiedTransaction};

/// Paystack response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Paystack client
pub struct PaystackClient {
    http: Client,
    config: PaystackConfig,
}

impl PaystackClient {
    /// Create a new Paystack client
    pub fn new(config: PaystackConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PaystackConfig::from_env()?))
    }

    pub const fn config(&self) -> &PaystackConfig {
        &self.config
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        // Paystack answers rejections with a JSON envelope; anything else
        // (HTML error pages, empty bodies) is a gateway fault.
        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(PaymentError::Gateway(format!("unreadable response: {e}")));
            }
            Err(_) => {
                return Err(PaymentError::Gateway(format!("provider returned {status}")));
            }
        };

        if status.is_server_error() {
            return Err(PaymentError::Gateway(format!("provider returned {status}: {}", envelope.message)));
        }

        if !status.is_success() || !envelope.status {
            return Err(PaymentError::Rejected(envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| PaymentError::Gateway("response carried no data".into()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(&self, request: InitializeTransaction) -> Result<InitializedTransaction> {
        tracing::debug!(
            email = %request.email,
            amount = request.amount,
            reference = ?request.reference,
            "Initializing Paystack transaction"
        );

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .json(&request)
            .send()
            .await?;

        Self::read(response).await
    }

    async fn verify(&self, reference: &Reference) -> Result<VerifiedTransaction> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| PaymentError::Config(format!("invalid PAYSTACK_BASE_URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config("PAYSTACK_BASE_URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["transaction", "verify", reference.as_str()]);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        Self::read(response).await
    }

    fn webhook_secret(&self) -> &str {
        &self.config.webhook_secret
    }

    fn name(&self) -> &str {
        "Paystack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStatus;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn client(server: &MockServer) -> PaystackClient {
        let config = PaystackConfig::new("sk_test_xxx").unwrap().with_base_url(server.base_url());
        PaystackClient::new(config)
    }

    #[tokio::test]
    async fn test_initialize_sends_bearer_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/transaction/initialize")
                    .header("Authorization", "Bearer sk_test_xxx")
                    .json_body(json!({
                        "email": "a@b.com",
                        "amount": 2_000_000,
                        "currency": "NGN",
                        "reference": "PQ-1"
                    }));
                then.status(200).json_body(json!({
                    "status": true,
                    "message": "Authorization URL created",
                    "data": {
                        "authorization_url": "https://checkout.paystack.com/abc",
                        "access_code": "abc",
                        "reference": "PQ-1"
                    }
                }));
            })
            .await;

        let request = InitializeTransaction::new("a@b.com", 2_000_000).with_reference(Reference::new("PQ-1"));
        let initialized = client(&server).initialize(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(initialized.authorization_url, "https://checkout.paystack.com/abc");
        assert_eq!(initialized.reference.as_str(), "PQ-1");
    }

    #[tokio::test]
    async fn test_rejection_message_passes_through() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/transaction/initialize");
                then.status(400).json_body(json!({
                    "status": false,
                    "message": "Invalid Email Address Passed"
                }));
            })
            .await;

        let err = client(&server)
            .initialize(InitializeTransaction::new("nope", 100))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Rejected(ref m) if m == "Invalid Email Address Passed"));
    }

    #[tokio::test]
    async fn test_server_error_is_gateway_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transaction/verify/PQ-1");
                then.status(502).body("<html>bad gateway</html>");
            })
            .await;

        let err = client(&server).verify(&Reference::new("PQ-1")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Gateway(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_verify_parses_transaction() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/transaction/verify/PQ-1")
                    .header("Authorization", "Bearer sk_test_xxx");
                then.status(200).json_body(json!({
                    "status": true,
                    "message": "Verification successful",
                    "data": {
                        "id": 42,
                        "status": "success",
                        "reference": "PQ-1",
                        "amount": 2_000_000,
                        "currency": "NGN",
                        "channel": "card",
                        "paid_at": "2024-08-22T09:15:02.000Z",
                        "metadata": ""
                    }
                }));
            })
            .await;

        let txn = client(&server).verify(&Reference::new("PQ-1")).await.unwrap();
        assert_eq!(txn.id, 42);
        assert_eq!(txn.status, TransactionStatus::Success);
        assert_eq!(txn.channel.as_deref(), Some("card"));
    }

    #[tokio::test]
    async fn test_unknown_reference_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transaction/verify/missing");
                then.status(400).json_body(json!({
                    "status": false,
                    "message": "Transaction reference not found"
                }));
            })
            .await;

        let err = client(&server).verify(&Reference::new("missing")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Rejected(_)));
    }
}
