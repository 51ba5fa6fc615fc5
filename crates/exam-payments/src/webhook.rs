//! Paystack Webhook Handling
//!
//! Verifies pushed events and feeds successful charges into the same
//! activator the callback page uses.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha512;

use crate::activation::SubscriptionActivator;
use crate::error::{PaymentError, Result};
use crate::subscription::BillingStore;
use crate::transaction::{Reference, VerifiedTransaction};

/// Header carrying the hex HMAC-SHA512 of the raw body
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

/// Hex HMAC-SHA512 of `body` under `secret`
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `signature` against the HMAC of the exact raw `body`
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let expected = hex::decode(signature.trim())
        .map_err(|_| PaymentError::WebhookSignature("signature is not hex".into()))?;

    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
}

/// Raw event envelope as pushed by the provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Parsed webhook event
#[derive(Clone, Debug)]
pub enum WebhookEvent {
    /// Charge settled successfully
    ChargeSucceeded(Box<VerifiedTransaction>),

    /// Charge attempt failed
    ChargeFailed { reference: Option<Reference> },

    TransferSucceeded { reference: Option<Reference> },

    TransferFailed { reference: Option<Reference> },

    /// Unhandled event type
    Other { event_type: String },
}

impl WebhookEvent {
    fn from_envelope(envelope: WebhookEnvelope) -> Result<Self> {
        let reference = || {
            envelope
                .data
                .get("reference")
                .and_then(Value::as_str)
                .map(Reference::from)
        };

        match envelope.event.as_str() {
            "charge.success" => {
                let txn: VerifiedTransaction = serde_json::from_value(envelope.data.clone())
                    .map_err(|e| PaymentError::WebhookParse(format!("invalid charge data: {e}")))?;
                Ok(Self::ChargeSucceeded(Box::new(txn)))
            }
            "charge.failed" => Ok(Self::ChargeFailed { reference: reference() }),
            "transfer.success" => Ok(Self::TransferSucceeded { reference: reference() }),
            "transfer.failed" => Ok(Self::TransferFailed { reference: reference() }),
            other => Ok(Self::Other {
                event_type: other.to_string(),
            }),
        }
    }
}

/// Webhook handler
pub struct WebhookHandler<S: BillingStore + ?Sized> {
    activator: SubscriptionActivator<S>,
}

impl<S: BillingStore + ?Sized> WebhookHandler<S> {
    pub const fn new(activator: SubscriptionActivator<S>) -> Self {
        Self { activator }
    }

    /// Verify webhook signature and parse the envelope.
    ///
    /// Returns `WebhookSignature` when the body is not authentic and
    /// `WebhookParse` when it is authentic but not an event envelope.
    pub fn parse_event(&self, payload: &[u8], signature: &str, secret: &str) -> Result<WebhookEnvelope> {
        verify_signature(secret, payload, signature)?;
        serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))
    }

    /// Process a verified event
    pub async fn handle(&self, envelope: WebhookEnvelope) -> Result<WebhookEvent> {
        tracing::info!(event_type = %envelope.event, "Processing Paystack webhook");

        let parsed = WebhookEvent::from_envelope(envelope)?;

        match &parsed {
            WebhookEvent::ChargeSucceeded(txn) => match txn.user_id() {
                Some(user_id) => {
                    self.activator.activate(user_id, txn).await?;
                }
                None => {
                    tracing::warn!(
                        reference = %txn.reference,
                        "Charge succeeded without a user id in metadata, not activating"
                    );
                }
            },

            WebhookEvent::ChargeFailed { reference } => {
                tracing::warn!(reference = ?reference, "Charge failed");
            }

            WebhookEvent::TransferSucceeded { reference } => {
                tracing::info!(reference = ?reference, "Transfer succeeded");
            }

            WebhookEvent::TransferFailed { reference } => {
                tracing::warn!(reference = ?reference, "Transfer failed");
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanId;
    use crate::subscription::MemoryBillingStore;
    use serde_json::json;
    use std::sync::Arc;

    const SECRET: &str = "sk_test_webhook";

    fn handler() -> (WebhookHandler<MemoryBillingStore>, Arc<MemoryBillingStore>) {
        let store = Arc::new(MemoryBillingStore::new());
        let handler = WebhookHandler::new(SubscriptionActivator::new(store.clone()));
        (handler, store)
    }

    fn charge_success(user_id: Option<&str>) -> String {
        let metadata = user_id.map_or(json!(""), |u| json!({ "user_id": u }));
        json!({
            "event": "charge.success",
            "data": {
                "id": 302_961,
                "status": "success",
                "reference": "PQ-hook",
                "amount": 5_000_000,
                "currency": "NGN",
                "channel": "card",
                "paid_at": "2024-08-22T09:15:02.000Z",
                "metadata": metadata
            }
        })
        .to_string()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"event":"charge.success","data":{}}"#;
        let signature = sign(SECRET, body).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verify_signature(SECRET, body, &signature).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"event":"charge.success","data":{}}"#;
        let signature = sign("other_secret", body).unwrap();
        assert!(matches!(
            verify_signature(SECRET, body, &signature),
            Err(PaymentError::WebhookSignature(_))
        ));
    }

    #[test]
    fn test_modified_body_rejected() {
        let original = br#"{"event":"charge.success","data":{"amount":100}}"#;
        let tampered = br#"{"event":"charge.success","data":{"amount":900}}"#;
        let signature = sign(SECRET, original).unwrap();
        assert!(verify_signature(SECRET, tampered, &signature).is_err());
    }

    #[test]
    fn test_whitespace_in_body_matters() {
        let body = br#"{"event":"charge.success"}"#;
        let reformatted = br#"{ "event": "charge.success" }"#;
        let signature = sign(SECRET, body).unwrap();
        assert!(verify_signature(SECRET, reformatted, &signature).is_err());
    }

    #[test]
    fn test_garbage_signature_rejected() {
        assert!(matches!(
            verify_signature(SECRET, b"{}", "not-hex"),
            Err(PaymentError::WebhookSignature(_))
        ));
    }

    #[test]
    fn test_authentic_non_json_is_parse_error() {
        let (handler, _) = handler();
        let body = b"not json";
        let err = handler.parse_event(body, &sign(SECRET, body).unwrap(), SECRET).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParse(_)));
    }

    #[tokio::test]
    async fn test_charge_success_activates() {
        let (handler, store) = handler();
        let body = charge_success(Some("user-9"));

        let envelope = handler
            .parse_event(body.as_bytes(), &sign(SECRET, body.as_bytes()).unwrap(), SECRET)
            .unwrap();
        let event = handler.handle(envelope).await.unwrap();

        assert!(matches!(event, WebhookEvent::ChargeSucceeded(_)));
        let active = store.active_subscription("user-9").await.unwrap().unwrap();
        assert_eq!(active.plan_id, PlanId::Premium);
        assert!(
            store
                .payment_by_reference(&Reference::new("PQ-hook"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_redelivery_does_not_duplicate() {
        let (handler, store) = handler();
        let body = charge_success(Some("user-9"));

        for _ in 0..3 {
            let envelope = handler
                .parse_event(body.as_bytes(), &sign(SECRET, body.as_bytes()).unwrap(), SECRET)
                .unwrap();
            handler.handle(envelope).await.unwrap();
        }

        assert_eq!(store.payments_for_user("user-9").await.unwrap().len(), 1);
        assert_eq!(store.subscriptions_for_user("user-9").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_charge_without_user_is_ignored() {
        let (handler, store) = handler();
        let envelope: WebhookEnvelope = serde_json::from_str(&charge_success(None)).unwrap();

        handler.handle(envelope).await.unwrap();
        assert!(
            store
                .payment_by_reference(&Reference::new("PQ-hook"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_event_changes_nothing() {
        let (handler, store) = handler();
        let envelope = WebhookEnvelope {
            event: "subscription.create".into(),
            data: json!({ "reference": "PQ-hook", "metadata": { "user_id": "user-9" } }),
        };

        let event = handler.handle(envelope).await.unwrap();
        assert!(matches!(event, WebhookEvent::Other { ref event_type } if event_type == "subscription.create"));
        assert!(store.subscriptions_for_user("user-9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_events_carry_reference() {
        let (handler, _) = handler();
        let envelope = WebhookEnvelope {
            event: "transfer.failed".into(),
            data: json!({ "reference": "TRF-1" }),
        };

        let event = handler.handle(envelope).await.unwrap();
        assert!(matches!(
            event,
            WebhookEvent::TransferFailed { reference: Some(ref r) } if r.as_str() == "TRF-1"
        ));
    }
}
