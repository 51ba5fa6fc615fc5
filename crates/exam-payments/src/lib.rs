//! # exam-payments
//!
//! Paystack payments and subscription activation for the past-questions portal.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  initialize  ┌─────────────────┐  redirect  ┌─────────────┐
//! │   Pricing   │─────────────▶│ Paystack Hosted │───────────▶│  Callback   │
//! │    page     │              │  Checkout Page  │            │    page     │
//! └─────────────┘              └────────┬────────┘            └──────┬──────┘
//!                                       │ charge.success             │ verify
//!                                       ▼                            ▼
//!                              ┌─────────────────────────────────────────────┐
//!                              │   SubscriptionActivator (by reference)      │
//!                              │   payment upsert → expire → insert active   │
//!                              └─────────────────────────────────────────────┘
//! ```
//!
//! The webhook and the callback page reach the same activator. Activation is
//! keyed by the transaction reference, so a redelivered webhook or a
//! double-submitted callback page cannot create a second payment record or a
//! second active subscription.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use exam_payments::{InitializeTransaction, PaymentGateway, PaystackClient, PaystackConfig, Reference};
//!
//! let client = PaystackClient::new(PaystackConfig::new("sk_test_xxx")?);
//!
//! let checkout = client
//!     .initialize(
//!         InitializeTransaction::new("student@example.com", 2_000_000)
//!             .with_reference(Reference::generate())
//!             .with_callback_url("https://portal.example.com/payment/callback"),
//!     )
//!     .await?;
//!
//! // Redirect user to: checkout.authorization_url
//! ```

pub mod activation;
pub mod config;
pub mod error;
pub mod gateway;
pub mod plan;
pub mod subscription;
pub mod transaction;
pub mod webhook;

pub use activation::{Activation, SubscriptionActivator};
pub use config::PaystackConfig;
pub use error::{PaymentError, Result};
pub use gateway::{MockGateway, PaymentGateway, PaystackClient};
pub use plan::{BillingInterval, Plan, PlanId};
pub use subscription::{
    ActivationOutcome, BillingStore, MemoryBillingStore, PaymentRecord, Subscription, SubscriptionStatus,
};
pub use transaction::{
    InitializeTransaction, InitializedTransaction, Reference, Transaction, TransactionStatus, VerifiedTransaction,
};
pub use webhook::{WebhookEnvelope, WebhookEvent, WebhookHandler};
