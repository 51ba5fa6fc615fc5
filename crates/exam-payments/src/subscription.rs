//! Subscriptions and Payment Records
//!
//! Durable records produced by activation, and the storage seam behind them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::plan::PlanId;
use crate::transaction::{Reference, TransactionStatus, VerifiedTransaction};

/// Subscription lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

/// A user's plan entitlement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Reference of the payment that bought this subscription
    pub transaction_reference: Reference,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// A new active annual subscription starting at `starts_at`
    pub fn annual(
        user_id: impl Into<String>,
        plan_id: PlanId,
        reference: Reference,
        starts_at: DateTime<Utc>,
    ) -> Result<Self> {
        let expires_at = starts_at
            .checked_add_months(Months::new(12))
            .ok_or_else(|| PaymentError::InvalidWindow(format!("{starts_at} + 1 year overflows")))?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            plan_id,
            status: SubscriptionStatus::Active,
            starts_at,
            expires_at,
            transaction_reference: reference,
            created_at: Utc::now(),
        })
    }

    /// Active and not past expiry
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Active => now < self.expires_at,
            SubscriptionStatus::Expired | SubscriptionStatus::Cancelled => false,
        }
    }
}

/// A confirmed charge. Written once per reference, never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub user_id: String,
    pub reference: Reference,

    /// Amount in kobo
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub provider_transaction_id: i64,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn from_transaction(user_id: impl Into<String>, txn: &VerifiedTransaction) -> Self {
        Self {
            user_id: user_id.into(),
            reference: txn.reference.clone(),
            amount: txn.amount,
            currency: txn.currency.clone(),
            status: txn.status,
            channel: txn.channel.clone(),
            paid_at: txn.paid_at,
            provider_transaction_id: txn.id,
            created_at: Utc::now(),
        }
    }
}

/// Result of asking the store to activate a subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// A new active row was written and older active rows expired
    Created(Subscription),

    /// The reference had already been activated; nothing changed
    Existing(Subscription),
}

impl ActivationOutcome {
    pub const fn subscription(&self) -> &Subscription {
        match self {
            Self::Created(s) | Self::Existing(s) => s,
        }
    }

    pub fn into_subscription(self) -> Subscription {
        match self {
            Self::Created(s) | Self::Existing(s) => s,
        }
    }

    pub const fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Payment and subscription storage
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Insert a payment unless one exists for its reference; returns the stored row
    async fn record_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord>;

    /// Get payment by reference
    async fn payment_by_reference(&self, reference: &Reference) -> Result<Option<PaymentRecord>>;

    /// All payments for a user, oldest first
    async fn payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>>;

    /// Expire the user's active subscriptions and insert `subscription`, as one
    /// atomic step. Replaying a reference returns the row it already produced.
    async fn activate_subscription(&self, subscription: Subscription) -> Result<ActivationOutcome>;

    /// The user's active subscription, if any
    async fn active_subscription(&self, user_id: &str) -> Result<Option<Subscription>>;

    /// Every subscription the user has held, oldest first
    async fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>>;

    /// Cancel the user's active subscription
    async fn cancel_subscription(&self, user_id: &str) -> Result<Subscription>;
}

#[derive(Default)]
struct Ledger {
    payments: HashMap<Reference, PaymentRecord>,
    payment_order: Vec<Reference>,
    subscriptions: Vec<Subscription>,
}

/// In-memory billing store (for development and tests)
pub struct MemoryBillingStore {
    ledger: RwLock<Ledger>,
}

impl Default for MemoryBillingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBillingStore {
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(Ledger::default()),
        }
    }
}

#[async_trait]
impl BillingStore for MemoryBillingStore {
    async fn record_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord> {
        let mut ledger = self.ledger.write().await;

        if let Some(existing) = ledger.payments.get(&payment.reference) {
            return Ok(existing.clone());
        }

        ledger.payment_order.push(payment.reference.clone());
        ledger.payments.insert(payment.reference.clone(), payment.clone());
        Ok(payment)
    }

    async fn payment_by_reference(&self, reference: &Reference) -> Result<Option<PaymentRecord>> {
        Ok(self.ledger.read().await.payments.get(reference).cloned())
    }

    async fn payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .payment_order
            .iter()
            .filter_map(|r| ledger.payments.get(r))
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn activate_subscription(&self, subscription: Subscription) -> Result<ActivationOutcome> {
        let mut ledger = self.ledger.write().await;

        if let Some(existing) = ledger
            .subscriptions
            .iter()
            .find(|s| s.transaction_reference == subscription.transaction_reference)
        {
            if existing.user_id != subscription.user_id {
                return Err(PaymentError::InvalidRequest(format!(
                    "reference {} was activated for another account",
                    subscription.transaction_reference
                )));
            }
            return Ok(ActivationOutcome::Existing(existing.clone()));
        }

        for prior in ledger
            .subscriptions
            .iter_mut()
            .filter(|s| s.user_id == subscription.user_id && s.status == SubscriptionStatus::Active)
        {
            prior.status = SubscriptionStatus::Expired;
        }

        ledger.subscriptions.push(subscription.clone());
        Ok(ActivationOutcome::Created(subscription))
    }

    async fn active_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .ledger
            .read()
            .await
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        Ok(self
            .ledger
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn cancel_subscription(&self, user_id: &str) -> Result<Subscription> {
        let mut ledger = self.ledger.write().await;

        let active = ledger
            .subscriptions
            .iter_mut()
            .find(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .ok_or_else(|| PaymentError::NotFound("Active subscription".into()))?;

        active.status = SubscriptionStatus::Cancelled;
        Ok(active.clone())
    }
}
