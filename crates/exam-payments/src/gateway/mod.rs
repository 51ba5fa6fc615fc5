//! Payment Gateway Integration
//!
//! Abstractions and implementations for the hosted payment provider.

mod mock;
mod paystack;

pub use mock::MockGateway;
pub use paystack::PaystackClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::transaction::{InitializeTransaction, InitializedTransaction, Reference, VerifiedTransaction};

/// Payment gateway trait (Strategy pattern)
///
/// The provider is the source of truth for transaction status; nothing here
/// writes local state.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a transaction and obtain the hosted checkout URL
    async fn initialize(&self, request: InitializeTransaction) -> Result<InitializedTransaction>;

    /// Fetch the authoritative state of a transaction
    async fn verify(&self, reference: &Reference) -> Result<VerifiedTransaction>;

    /// Secret used to sign webhook bodies sent by this provider
    fn webhook_secret(&self) -> &str;

    /// Gateway name
    fn name(&self) -> &str;
}
