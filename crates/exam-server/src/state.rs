//! Application State

use std::sync::Arc;

use exam_payments::{BillingStore, PaymentGateway, SubscriptionActivator, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment gateway (None if Paystack is not configured)
    pub gateway: Option<Arc<dyn PaymentGateway>>,

    /// Payment and subscription records
    pub store: Arc<dyn BillingStore>,

    /// Activation shared by the callback and webhook paths
    pub activator: SubscriptionActivator<dyn BillingStore>,
}

impl AppState {
    pub fn new(gateway: Option<Arc<dyn PaymentGateway>>, store: Arc<dyn BillingStore>) -> Self {
        Self {
            gateway,
            activator: SubscriptionActivator::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn webhook_handler(&self) -> WebhookHandler<dyn BillingStore> {
        WebhookHandler::new(self.activator.clone())
    }
}
