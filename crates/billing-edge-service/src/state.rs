//! Application state.

use std::sync::Arc;

use billing_edge_store::SubscriptionStore;

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::hooks::{NoopHooks, WebhookHooks};
use crate::stripe::WebhookVerifier;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// Subscription store (absent when no database is configured).
    pub store: Option<Arc<dyn SubscriptionStore>>,

    /// Stripe webhook verifier (absent when no signing secret is configured).
    pub verifier: Option<WebhookVerifier>,

    /// Side effects for verified webhook events.
    pub hooks: Arc<dyn WebhookHooks>,

    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create a new application state with the system clock and no-op hooks.
    #[must_use]
    pub fn new(config: ServiceConfig, store: Option<Arc<dyn SubscriptionStore>>) -> Self {
        let verifier = config.stripe_webhook_secret.as_ref().map(|secret| {
            tracing::info!("Stripe webhook verification enabled");
            WebhookVerifier::new(secret.clone(), config.stripe_webhook_tolerance_seconds)
        });

        if verifier.is_none() {
            tracing::warn!("Stripe webhook secret not configured - webhooks will be rejected");
        }

        if store.is_none() {
            tracing::warn!("Database not configured - subscription renewals will fail");
        }

        if config.cron_secret.is_none() && !config.cron_trust_scheduler_header {
            tracing::warn!("No cron credential accepted - renewal endpoint is unreachable");
        }

        Self {
            config,
            store,
            verifier,
            hooks: Arc::new(NoopHooks),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the webhook hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn WebhookHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
