//! HTTP Handlers

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use exam_payments::{
    InitializeTransaction, InitializedTransaction, PaymentError, PaymentGateway, PaymentRecord, Plan,
    Reference, Subscription, VerifiedTransaction, plan, webhook::SIGNATURE_HEADER,
};

use crate::state::AppState;

/// Header set by the auth layer in front of this service
pub const USER_ID_HEADER: &str = "x-user-id";

// ============================================================================
// Response Types
// ============================================================================

/// `{status, message, data}` envelope shared by every payment endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

/// Failure envelope `{status: false, message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_configured() -> Self {
        PaymentError::Config("payment gateway not configured".into()).into()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let status = match &err {
            PaymentError::Config(_)
            | PaymentError::Gateway(_)
            | PaymentError::InvalidWindow(_)
            | PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PaymentError::InvalidRequest(_)
            | PaymentError::Rejected(_)
            | PaymentError::NotPaid(_)
            | PaymentError::UnqualifiedAmount(_)
            | PaymentError::WebhookParse(_) => StatusCode::BAD_REQUEST,
            PaymentError::WebhookSignature(_) => StatusCode::UNAUTHORIZED,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        Self::new(status, err.user_message())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "status": false, "message": self.message }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub email: Option<String>,
    pub amount: Option<i64>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    pub transaction: VerifiedTransaction,
    pub payment: Option<PaymentRecord>,
    pub subscription: Option<Subscription>,
    pub newly_activated: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<Subscription>,
    pub plan: Option<Plan>,
    pub payments: Vec<PaymentRecord>,
}

// ============================================================================
// Helpers
// ============================================================================

fn gateway(state: &AppState) -> Result<&Arc<dyn PaymentGateway>, ApiError> {
    state.gateway.as_ref().ok_or_else(ApiError::not_configured)
}

fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Authentication required"))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway: state.gateway.as_ref().map(|g| g.name().to_string()),
    })
}

/// Plan catalog
pub async fn list_plans() -> Json<ApiResponse<Vec<Plan>>> {
    ApiResponse::ok("Plans retrieved", plan::catalog())
}

/// Create a provider transaction and hand back the checkout URL.
///
/// Nothing is written locally; the reference is forwarded untouched.
pub async fn initialize_payment(
    State(state): State<AppState>,
    payload: Result<Json<InitializeRequest>, JsonRejection>,
) -> ApiResult<InitializedTransaction> {
    let gateway = gateway(&state)?;
    let Json(payload) = payload?;

    let email = required(payload.email, "email")?;
    let amount = payload
        .amount
        .ok_or_else(|| ApiError::bad_request("amount is required"))?;
    if amount <= 0 {
        return Err(ApiError::bad_request("amount must be greater than zero"));
    }

    let mut request = InitializeTransaction::new(email, amount)
        .with_metadata(payload.metadata.unwrap_or(Value::Null));
    if let Some(reference) = payload.reference.filter(|r| !r.trim().is_empty()) {
        request = request.with_reference(Reference::new(reference));
    }
    if let Some(url) = payload.callback_url.filter(|u| !u.trim().is_empty()) {
        request = request.with_callback_url(url);
    }

    let initialized = gateway.initialize(request).await.map_err(|e| {
        tracing::error!(error = %e, "Initialize failed");
        ApiError::from(e)
    })?;

    tracing::info!(reference = %initialized.reference, amount, "Transaction initialized");
    Ok(ApiResponse::ok("Authorization URL created", initialized))
}

/// Ask the provider for the authoritative state of a transaction
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<VerifiedTransaction> {
    let gateway = gateway(&state)?;
    let reference = Reference::new(required(query.reference, "reference")?);

    let transaction = gateway.verify(&reference).await.map_err(|e| {
        tracing::warn!(reference = %reference, error = %e, "Verification failed");
        ApiError::from(e)
    })?;

    Ok(ApiResponse::ok("Verification successful", transaction))
}

/// Verify a returning payer's transaction and activate their subscription
pub async fn activate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ActivateRequest>, JsonRejection>,
) -> ApiResult<ActivateResponse> {
    let gateway = gateway(&state)?;
    let user_id = user_id(&headers)?;
    let Json(payload) = payload?;
    let reference = Reference::new(required(payload.reference, "reference")?);

    let transaction = gateway.verify(&reference).await.map_err(|e| {
        tracing::warn!(
            reference = %reference,
            retryable = e.is_retryable(),
            error = %e,
            "Verification before activation failed"
        );
        ApiError::from(e)
    })?;

    match state.activator.activate(&user_id, &transaction).await {
        Ok(activation) => Ok(ApiResponse::ok(
            "Subscription activated",
            ActivateResponse {
                transaction,
                payment: activation.payment,
                subscription: Some(activation.subscription),
                newly_activated: activation.newly_activated,
            },
        )),
        // The charge went through; keep the payer off an error screen.
        Err(PaymentError::Storage(e)) => {
            tracing::error!(
                reference = %reference,
                user_id = %user_id,
                error = %e,
                "Payment verified but subscription could not be stored"
            );
            let payment = match state.store.payment_by_reference(&reference).await {
                Ok(payment) => payment,
                Err(e) => {
                    tracing::error!(reference = %reference, error = %e, "Payment lookup failed");
                    None
                }
            };
            Ok(ApiResponse::ok(
                "Payment verified",
                ActivateResponse {
                    transaction,
                    payment,
                    subscription: None,
                    newly_activated: false,
                },
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Provider-pushed events.
///
/// Answers 200 for every authentic delivery, whatever happens while
/// processing it; only signature failures are refused.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let gateway = gateway(&state)?;

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Webhook without signature header");
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid signature"));
    };

    let handler = state.webhook_handler();

    match handler.parse_event(&body, signature, gateway.webhook_secret()) {
        Ok(envelope) => {
            if let Err(e) = handler.handle(envelope).await {
                tracing::error!(retryable = e.is_retryable(), error = %e, "Webhook processing error");
            }
        }
        Err(PaymentError::WebhookSignature(e)) => {
            tracing::warn!(error = %e, "Webhook signature failed");
            return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid signature"));
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook payload unreadable");
        }
    }

    Ok(Json(json!({ "status": true })))
}

/// Current subscription and payment history for the caller
pub async fn current_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SubscriptionResponse> {
    let user_id = user_id(&headers)?;

    let subscription = state
        .store
        .active_subscription(&user_id)
        .await?
        .filter(|s| s.is_current(Utc::now()));
    let payments = state.store.payments_for_user(&user_id).await?;

    Ok(ApiResponse::ok(
        "Subscription retrieved",
        SubscriptionResponse {
            plan: subscription.as_ref().map(|s| s.plan_id.plan()),
            subscription,
            payments,
        },
    ))
}

/// Cancel the caller's active subscription
pub async fn cancel_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Subscription> {
    let user_id = user_id(&headers)?;
    let cancelled = state.store.cancel_subscription(&user_id).await?;

    tracing::info!(user_id = %user_id, subscription_id = %cancelled.id, "Subscription cancelled");
    Ok(ApiResponse::ok("Subscription cancelled", cancelled))
}
