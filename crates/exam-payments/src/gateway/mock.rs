//! Mock Payment Gateway
//!
//! For testing and local development. Keeps an in-memory ledger of
//! transactions and lets the caller play the provider's part by settling them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use super::PaymentGateway;
use crate::error::{PaymentError, Result};
use crate::transaction::{
    InitializeTransaction, InitializedTransaction, Reference, Transaction, TransactionStatus,
    VerifiedTransaction,
};

struct Entry {
    transaction: Transaction,
    metadata: Value,
}

/// In-memory stand-in for the hosted provider
pub struct MockGateway {
    ledger: RwLock<HashMap<Reference, Entry>>,
    next_id: AtomicI64,
    webhook_secret: String,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_webhook_secret("sk_test_mock")
    }

    pub fn with_webhook_secret(secret: impl Into<String>) -> Self {
        Self {
            ledger: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1_000),
            webhook_secret: secret.into(),
        }
    }

    /// Settle a transaction the way the provider would after checkout
    pub async fn complete(
        &self,
        reference: &Reference,
        status: TransactionStatus,
        channel: &str,
    ) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let entry = ledger
            .get_mut(reference)
            .ok_or_else(|| PaymentError::Rejected("Transaction reference not found".into()))?;
        if entry.transaction.status.is_terminal() {
            return Err(PaymentError::Rejected("Transaction already settled".into()));
        }

        let provider_id = entry.transaction.provider_transaction_id.unwrap_or_default();
        entry.transaction.settle(provider_id, status, Some(channel.to_string()));
        Ok(())
    }

    /// Build the JSON body the provider would push for `event`
    pub async fn webhook_body(&self, event: &str, reference: &Reference) -> Result<String> {
        let data = self.verify(reference).await?;
        let body = json!({ "event": event, "data": data });
        serde_json::to_string(&body).map_err(|e| PaymentError::WebhookParse(e.to_string()))
    }

    fn to_verified(entry: &Entry) -> VerifiedTransaction {
        let txn = &entry.transaction;
        let mut extra = Map::new();
        extra.insert(
            "gateway_response".into(),
            json!(match txn.status {
                TransactionStatus::Success => "Successful",
                TransactionStatus::Pending => "Pending",
                TransactionStatus::Failed => "Declined",
                TransactionStatus::Abandoned => "The transaction was not completed",
            }),
        );
        extra.insert("customer".into(), json!({ "email": txn.email }));

        VerifiedTransaction {
            id: txn.provider_transaction_id.unwrap_or_default(),
            status: txn.status,
            reference: txn.reference.clone(),
            amount: txn.amount,
            currency: txn.currency.clone(),
            channel: txn.channel.clone(),
            paid_at: txn.paid_at,
            created_at: Some(txn.created_at),
            metadata: entry.metadata.clone(),
            extra,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(&self, request: InitializeTransaction) -> Result<InitializedTransaction> {
        if !request.email.contains('@') {
            return Err(PaymentError::Rejected("Invalid Email Address Passed".into()));
        }
        if request.amount <= 0 {
            return Err(PaymentError::Rejected("Invalid Amount Sent".into()));
        }

        let mut ledger = self.ledger.write().await;

        let reference = request.reference.clone().unwrap_or_else(Reference::generate);
        if ledger.contains_key(&reference) {
            return Err(PaymentError::Rejected("Duplicate Transaction Reference".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let access_code = format!("ac_{id}");
        let initialized = InitializedTransaction {
            authorization_url: format!("https://checkout.mock.local/{access_code}"),
            access_code,
            reference: reference.clone(),
        };

        let mut transaction = Transaction::pending(&request, &initialized);
        transaction.provider_transaction_id = Some(id);

        ledger.insert(
            reference,
            Entry {
                transaction,
                metadata: request.metadata,
            },
        );

        Ok(initialized)
    }

    async fn verify(&self, reference: &Reference) -> Result<VerifiedTransaction> {
        self.ledger
            .read()
            .await
            .get(reference)
            .map(Self::to_verified)
            .ok_or_else(|| PaymentError::Rejected("Transaction reference not found".into()))
    }

    fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    fn name(&self) -> &str {
        "MockGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_then_verify_round_trip() {
        let gateway = MockGateway::new();
        let request = InitializeTransaction::new("a@b.com", 2_000_000)
            .with_metadata(json!({"user_id": "user-1"}));

        let initialized = gateway.initialize(request).await.unwrap();
        let pending = gateway.verify(&initialized.reference).await.unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);
        assert_eq!(pending.reference, initialized.reference);

        gateway
            .complete(&initialized.reference, TransactionStatus::Success, "card")
            .await
            .unwrap();

        let settled = gateway.verify(&initialized.reference).await.unwrap();
        assert_eq!(settled.status, TransactionStatus::Success);
        assert_eq!(settled.amount, 2_000_000);
        assert_eq!(settled.user_id(), Some("user-1"));
        assert!(settled.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_verify_is_repeatable() {
        let gateway = MockGateway::new();
        let initialized = gateway
            .initialize(InitializeTransaction::new("a@b.com", 500))
            .await
            .unwrap();
        gateway
            .complete(&initialized.reference, TransactionStatus::Failed, "bank")
            .await
            .unwrap();

        let first = gateway.verify(&initialized.reference).await.unwrap();
        let second = gateway.verify(&initialized.reference).await.unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_settled_transaction_cannot_change() {
        let gateway = MockGateway::new();
        let initialized = gateway
            .initialize(InitializeTransaction::new("a@b.com", 500))
            .await
            .unwrap();
        gateway
            .complete(&initialized.reference, TransactionStatus::Success, "card")
            .await
            .unwrap();

        let err = gateway
            .complete(&initialized.reference, TransactionStatus::Failed, "card")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Rejected(_)));
        let verified = gateway.verify(&initialized.reference).await.unwrap();
        assert_eq!(verified.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let gateway = MockGateway::new();
        let reference = Reference::new("PQ-dup");
        let request = InitializeTransaction::new("a@b.com", 500).with_reference(reference.clone());

        gateway.initialize(request.clone()).await.unwrap();
        let err = gateway.initialize(request).await.unwrap_err();
        assert!(matches!(err, PaymentError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let gateway = MockGateway::new();
        let err = gateway.verify(&Reference::new("nope")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Rejected(_)));
    }
}
