//! Transactions
//!
//! Request/response shapes exchanged with the gateway, and the local model
//! of a single payment attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::plan::PlanId;

/// The only currency the portal charges in
pub const CURRENCY: &str = "NGN";

/// Lifecycle of a payment attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[serde(alias = "ongoing", alias = "processing", alias = "queued")]
    Pending,
    Success,
    #[serde(alias = "reversed")]
    Failed,
    Abandoned,
}

impl TransactionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Whether the provider will not change this status again
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::Pending => false,
            Self::Success | Self::Failed | Self::Abandoned => true,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-generated idempotency key for one payment attempt
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Generate a new globally unique reference
    pub fn generate() -> Self {
        Self(format!("PQ-{}", Uuid::new_v4().simple()))
    }

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Request to create a transaction at the provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitializeTransaction {
    /// Payer email
    pub email: String,

    /// Amount in kobo
    pub amount: i64,

    /// Always [`CURRENCY`]
    pub currency: String,

    /// Omitted references are assigned by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl InitializeTransaction {
    pub fn new(email: impl Into<String>, amount: i64) -> Self {
        Self {
            email: email.into(),
            amount,
            currency: CURRENCY.into(),
            reference: None,
            callback_url: None,
            metadata: Value::Null,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    #[must_use]
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Provider's answer to a successful initialize call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedTransaction {
    /// Hosted checkout page to redirect the payer to
    pub authorization_url: String,
    pub access_code: String,
    pub reference: Reference,
}

/// The provider's canonical view of a transaction.
///
/// Fields the portal does not interpret are kept in `extra` so the object can
/// be handed back to callers exactly as the provider sent it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    /// Provider-assigned transaction id
    pub id: i64,
    pub status: TransactionStatus,
    pub reference: Reference,

    /// Amount in kobo
    pub amount: i64,
    pub currency: String,

    /// card, bank, ussd, ...
    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Arbitrary metadata attached at initialize time. The provider returns an
    /// empty string when none was sent.
    #[serde(default)]
    pub metadata: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerifiedTransaction {
    /// Portal user id carried in the metadata, if any
    pub fn user_id(&self) -> Option<&str> {
        self.metadata
            .get("user_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Plan the payer selected on the pricing page, if recorded
    pub fn requested_plan(&self) -> Option<PlanId> {
        self.metadata
            .get("plan")
            .and_then(Value::as_str)
            .and_then(PlanId::parse)
    }

    pub const fn is_successful(&self) -> bool {
        matches!(self.status, TransactionStatus::Success)
    }
}

/// One payment attempt as tracked locally
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub email: String,

    /// Amount in kobo
    pub amount: i64,
    pub currency: String,
    pub reference: Reference,
    pub status: TransactionStatus,
    pub plan_id: Option<PlanId>,
    pub provider_transaction_id: Option<i64>,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A freshly initialized, not yet settled attempt
    pub fn pending(request: &InitializeTransaction, initialized: &InitializedTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: request
                .metadata
                .get("user_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            email: request.email.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            reference: initialized.reference.clone(),
            status: TransactionStatus::Pending,
            plan_id: request
                .metadata
                .get("plan")
                .and_then(Value::as_str)
                .and_then(PlanId::parse),
            provider_transaction_id: None,
            authorization_url: Some(initialized.authorization_url.clone()),
            access_code: Some(initialized.access_code.clone()),
            channel: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    /// Record the provider's final word on this attempt
    pub fn settle(&mut self, provider_id: i64, status: TransactionStatus, channel: Option<String>) {
        self.provider_transaction_id = Some(provider_id);
        self.status = status;
        self.channel = channel;
        self.paid_at = match status {
            TransactionStatus::Success => Some(Utc::now()),
            TransactionStatus::Pending | TransactionStatus::Failed | TransactionStatus::Abandoned => None,
        };
    }
}
