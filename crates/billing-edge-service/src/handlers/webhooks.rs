//! Stripe webhook handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::hooks::{HookError, SubscriptionChange, WebhookHooks};
use crate::state::AppState;
use crate::stripe::{Event, EventPayload};

/// Header carrying the Stripe signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was received.
    pub received: bool,
}

/// Handle Stripe webhooks.
///
/// The body is taken as raw bytes: the signature covers the exact bytes Stripe
/// sent, so it is verified before anything is parsed.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Stripe webhook secret not configured".into()))?;

    verifier
        .verify(&body, signature, state.clock.now())
        .map_err(|e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::BadRequest("Invalid webhook signature".into())
        })?;

    let event = Event::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Verified Stripe webhook has an invalid payload");
        ApiError::BadRequest("Invalid webhook payload".into())
    })?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.payload.event_type(),
        livemode = event.livemode,
        "Received Stripe webhook"
    );

    if let Err(e) = dispatch(state.hooks.as_ref(), &event).await {
        tracing::error!(
            event_id = %event.id,
            event_type = %event.payload.event_type(),
            error = %e,
            "Webhook hook failed"
        );
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Log a verified event and run its hook.
///
/// # Errors
///
/// Returns the hook's error; unhandled events never fail.
pub async fn dispatch(hooks: &dyn WebhookHooks, event: &Event) -> Result<(), HookError> {
    match &event.payload {
        EventPayload::CheckoutSessionCompleted(session) => {
            let order = session.order_summary();
            tracing::info!(
                session_id = %order.session_id,
                product = ?order.product,
                tier = ?order.tier,
                customer_email = ?order.customer_email,
                amount_total = ?order.amount_total,
                currency = ?order.currency,
                "Checkout session completed"
            );
            hooks.checkout_completed(session).await
        }
        EventPayload::SubscriptionCreated(sub) => {
            log_subscription(SubscriptionChange::Created, &sub.id, sub.status.as_deref());
            hooks.subscription_changed(SubscriptionChange::Created, sub).await
        }
        EventPayload::SubscriptionUpdated(sub) => {
            log_subscription(SubscriptionChange::Updated, &sub.id, sub.status.as_deref());
            hooks.subscription_changed(SubscriptionChange::Updated, sub).await
        }
        EventPayload::SubscriptionDeleted(sub) => {
            log_subscription(SubscriptionChange::Deleted, &sub.id, sub.status.as_deref());
            hooks.subscription_changed(SubscriptionChange::Deleted, sub).await
        }
        EventPayload::InvoicePaid(invoice) => {
            tracing::info!(
                invoice_id = %invoice.id,
                amount_paid = invoice.amount_paid,
                currency = ?invoice.currency,
                "Invoice paid"
            );
            hooks.invoice_paid(invoice).await
        }
        EventPayload::InvoicePaymentFailed(invoice) => {
            tracing::warn!(
                invoice_id = %invoice.id,
                customer_email = ?invoice.customer_email,
                amount_due = invoice.amount_due,
                "Invoice payment failed - customer may need to update payment method"
            );
            hooks.invoice_payment_failed(invoice).await
        }
        EventPayload::Unhandled { event_type } => {
            tracing::debug!(event_type = %event_type, "Unhandled Stripe event");
            Ok(())
        }
    }
}

fn log_subscription(change: SubscriptionChange, id: &str, status: Option<&str>) {
    tracing::info!(
        subscription_id = %id,
        status = ?status,
        change = ?change,
        "Subscription event"
    );
}
