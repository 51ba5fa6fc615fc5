//! Past-questions portal payment server
//!
//! Axum-based server providing the Paystack payment API.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exam_payments::{MemoryBillingStore, MockGateway, PaymentGateway, PaystackClient};
use exam_server::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize payments
    let gateway: Option<Arc<dyn PaymentGateway>> =
        if std::env::var("PAYMENT_GATEWAY").is_ok_and(|v| v.eq_ignore_ascii_case("mock")) {
            tracing::warn!("Using mock payment gateway - no real charges will be made");
            Some(Arc::new(MockGateway::new()))
        } else {
            match PaystackClient::from_env() {
                Ok(client) => {
                    tracing::info!(base_url = %client.config().base_url, "Paystack configured");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Paystack not configured - payment endpoints will fail");
                    tracing::warn!("Set PAYSTACK_SECRET_KEY (and optionally PAYSTACK_WEBHOOK_SECRET) in .env");
                    None
                }
            }
        };

    let state = AppState::new(gateway, Arc::new(MemoryBillingStore::new()));
    let app = router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Payment server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  GET  /payment/plans                - Plan catalog");
    tracing::info!("  POST /payment/initialize           - Start a Paystack checkout");
    tracing::info!("  GET  /payment/verify?reference=    - Verify a transaction");
    tracing::info!("  POST /payment/activate             - Activate a paid subscription");
    tracing::info!("  POST /payment/webhook              - Paystack webhook");
    tracing::info!("  GET  /payment/subscription         - Current subscription");
    tracing::info!("  POST /payment/subscription/cancel  - Cancel subscription");

    axum::serve(listener, app).await?;

    Ok(())
}
