//! exam-server
//!
//! Axum server exposing the past-questions portal payment API:
//! initialize, verify, activate, webhook, and subscription queries.

pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    activate_payment, cancel_subscription, current_subscription, health_check, initialize_payment,
    list_plans, payment_webhook, verify_payment,
};
pub use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/payment/plans", get(list_plans))
        .route("/payment/initialize", post(initialize_payment))
        .route("/payment/verify", get(verify_payment))
        .route("/payment/activate", post(activate_payment))
        .route("/payment/webhook", post(payment_webhook))
        .route("/payment/subscription", get(current_subscription))
        .route("/payment/subscription/cancel", post(cancel_subscription))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
