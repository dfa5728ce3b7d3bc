//! Billing Edge Service - Stripe webhooks and subscription renewals
//!
//! This is the main entry point for the billing-edge service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billing_edge_service::{create_router, AppState, ServiceConfig};
use billing_edge_store::{PgStore, SubscriptionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,billing_edge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Billing Edge Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        stripe_webhooks_configured = %config.stripe_webhook_secret.is_some(),
        cron_secret_configured = %config.cron_secret.is_some(),
        cron_scheduler_header = %config.cron_scheduler_header,
        "Service configuration loaded"
    );

    // Connect to PostgreSQL if configured
    let store: Option<Arc<dyn SubscriptionStore>> = match &config.database_url {
        Some(url) => {
            tracing::info!(
                max_connections = config.database_max_connections,
                "Connecting to PostgreSQL"
            );
            let store = PgStore::connect(url, config.database_max_connections).await?;
            if config.run_migrations {
                store.migrate().await?;
            }
            Some(Arc::new(store) as Arc<dyn SubscriptionStore>)
        }
        None => None,
    };

    // Build app state
    let state = AppState::new(config.clone(), store);

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Billing Edge Service stopped");
    Ok(())
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
