//! Paystack Configuration
//!
//! Secrets are read once at startup and handed to the gateway client;
//! nothing below reads the environment per request.

use crate::error::{PaymentError, Result};

/// Default Paystack API host
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Paystack credentials and endpoint
#[derive(Clone)]
pub struct PaystackConfig {
    /// Server-only secret key (`sk_...`), sent as bearer token
    pub secret_key: String,

    /// Key used to sign webhook bodies. Paystack signs with the secret key.
    pub webhook_secret: String,

    /// API base URL, overridable for tests
    pub base_url: String,
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PaystackConfig {
    /// Create a config; the webhook secret defaults to the secret key
    pub fn new(secret_key: impl Into<String>) -> Result<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(PaymentError::Config("PAYSTACK_SECRET_KEY is empty".into()));
        }

        Ok(Self {
            webhook_secret: secret_key.clone(),
            secret_key,
            base_url: DEFAULT_BASE_URL.into(),
        })
    }

    /// Use a distinct webhook signing secret
    #[must_use]
    pub fn with_webhook_secret(mut self, webhook_secret: impl Into<String>) -> Self {
        self.webhook_secret = webhook_secret.into();
        self
    }

    /// Point the client at a different API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from environment variables
    ///
    /// - `PAYSTACK_SECRET_KEY` (required)
    /// - `PAYSTACK_WEBHOOK_SECRET` (optional, defaults to the secret key)
    /// - `PAYSTACK_BASE_URL` (optional)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret_key = lookup("PAYSTACK_SECRET_KEY")
            .ok_or_else(|| PaymentError::Config("PAYSTACK_SECRET_KEY not set".into()))?;
        let mut config = Self::new(secret_key)?;

        if let Some(webhook_secret) = lookup("PAYSTACK_WEBHOOK_SECRET").filter(|s| !s.trim().is_empty()) {
            config = config.with_webhook_secret(webhook_secret);
        }
        if let Some(base_url) = lookup("PAYSTACK_BASE_URL").filter(|s| !s.trim().is_empty()) {
            config = config.with_base_url(base_url);
        }

        Ok(config)
    }
}
