//! Payment Error Types

use thiserror::Error;

use crate::transaction::TransactionStatus;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Required configuration (secret keys) is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an invalid or incomplete request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider answered but refused the operation; carries its message verbatim
    #[error("{0}")]
    Rejected(String),

    /// Provider unreachable or returned something we could not read
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Amount does not map to any paid plan
    #[error("Amount {0} does not qualify for a paid plan")]
    UnqualifiedAmount(i64),

    /// Transaction has not settled successfully
    #[error("Transaction not paid (status: {0})")]
    NotPaid(TransactionStatus),

    /// Subscription window could not be computed
    #[error("Invalid subscription window: {0}")]
    InvalidWindow(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::Storage(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "Payment service is not configured".into(),
            Self::InvalidRequest(msg) | Self::Rejected(msg) => msg.clone(),
            Self::Gateway(_) => "Payment provider is unavailable. Please try again.".into(),
            Self::WebhookSignature(_) => "Invalid signature".into(),
            Self::UnqualifiedAmount(_) => "Payment amount does not match any plan.".into(),
            Self::NotPaid(status) => format!("Payment has not been completed (status: {status})"),
            Self::NotFound(what) => format!("{what} not found"),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gateway(err.to_string())
    }
}
