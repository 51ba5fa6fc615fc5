//! Subscription Activation
//!
//! Turns a verified, successful transaction into a payment record and an
//! active annual subscription. Both the callback page and the webhook go
//! through [`SubscriptionActivator::activate`], keyed by the transaction
//! reference, so duplicate delivery is harmless.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::error::{PaymentError, Result};
use crate::plan::plan_for_amount;
use crate::subscription::{BillingStore, PaymentRecord, Subscription};
use crate::transaction::{TransactionStatus, VerifiedTransaction};

/// What an activation produced
#[derive(Clone, Debug, Serialize)]
pub struct Activation {
    /// `None` when the payment could not be recorded; activation still ran
    pub payment: Option<PaymentRecord>,
    pub subscription: Subscription,

    /// False when this reference had already been activated
    pub newly_activated: bool,
}

/// Records payments and grants subscriptions
pub struct SubscriptionActivator<S: BillingStore + ?Sized> {
    store: Arc<S>,
}

impl<S: BillingStore + ?Sized> Clone for SubscriptionActivator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: BillingStore + ?Sized> SubscriptionActivator<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Activate the subscription bought by `txn` for `user_id`
    pub async fn activate(&self, user_id: &str, txn: &VerifiedTransaction) -> Result<Activation> {
        if user_id.trim().is_empty() {
            return Err(PaymentError::InvalidRequest("user id is required".into()));
        }

        // The payer is fixed at initialize; a leaked reference must not move the grant.
        if let Some(owner) = txn.user_id() {
            if owner != user_id {
                tracing::warn!(
                    reference = %txn.reference,
                    owner = %owner,
                    user_id = %user_id,
                    "Activation attempted for another user's transaction"
                );
                return Err(PaymentError::InvalidRequest(
                    "Transaction does not belong to this user".into(),
                ));
            }
        }

        match txn.status {
            TransactionStatus::Success => {}
            status @ (TransactionStatus::Pending | TransactionStatus::Failed | TransactionStatus::Abandoned) => {
                return Err(PaymentError::NotPaid(status));
            }
        }

        // A failed payment insert must not strand a user who was charged.
        let payment = match self
            .store
            .record_payment(PaymentRecord::from_transaction(user_id, txn))
            .await
        {
            Ok(payment) => Some(payment),
            Err(e) => {
                tracing::error!(
                    reference = %txn.reference,
                    user_id = %user_id,
                    error = %e,
                    "Failed to record payment, continuing with activation"
                );
                None
            }
        };

        let plan = plan_for_amount(txn.amount).ok_or(PaymentError::UnqualifiedAmount(txn.amount))?;

        if let Some(requested) = txn.requested_plan() {
            if requested != plan {
                tracing::warn!(
                    reference = %txn.reference,
                    amount = txn.amount,
                    requested = %requested,
                    granted = %plan,
                    "Paid amount does not match the selected plan"
                );
            }
        }

        let subscription = Subscription::annual(user_id, plan, txn.reference.clone(), Utc::now())?;
        let outcome = self.store.activate_subscription(subscription).await?;

        if outcome.is_new() {
            tracing::info!(
                reference = %txn.reference,
                user_id = %user_id,
                plan = %plan,
                expires_at = %outcome.subscription().expires_at,
                "Activated subscription"
            );
        } else {
            tracing::debug!(reference = %txn.reference, "Reference already activated");
        }

        Ok(Activation {
            payment,
            newly_activated: outcome.is_new(),
            subscription: outcome.into_subscription(),
        })
    }
}
