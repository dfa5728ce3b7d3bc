//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::method_not_allowed;
use crate::handlers::{health, renewals, webhooks};
use crate::state::AppState;

/// Renewal sweeps within one process run one at a time.
const RENEWAL_MAX_CONCURRENT_REQUESTS: usize = 1;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Webhooks (Signature verification)
/// - `POST /api/webhooks/stripe` - Stripe webhooks
///
/// ## Cron (scheduler marker or bearer secret)
/// - `GET|POST /api/cron/renew-subscriptions` - Roll due subscriptions forward
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    // One permit shared by GET, POST and the fallback.
    let renew: MethodRouter = get(renewals::renew_subscriptions)
        .post(renewals::renew_subscriptions)
        .fallback(method_not_allowed)
        .with_state(state.clone());
    let cron_routes = Router::new().route_service(
        "/renew-subscriptions",
        ServiceBuilder::new()
            .layer(ConcurrencyLimitLayer::new(RENEWAL_MAX_CONCURRENT_REQUESTS))
            .service(renew),
    );

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/webhooks/stripe",
            post(webhooks::stripe_webhook).fallback(method_not_allowed),
        )
        .nest("/api/cron", cron_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}
