//! Extension points for webhook side effects.
//!
//! The dispatcher logs every handled event and then calls the matching hook.
//! Every method defaults to a no-op; implement only the ones you need.
//! Unhandled event types never reach a hook.

use async_trait::async_trait;

use crate::stripe::{CheckoutSession, Invoice, StripeSubscription};

/// Error returned by a hook. It is logged and does not change the response.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

/// Which subscription lifecycle event occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    /// `customer.subscription.created`
    Created,
    /// `customer.subscription.updated`
    Updated,
    /// `customer.subscription.deleted`
    Deleted,
}

/// Side effects run after a webhook event is verified and logged.
#[async_trait]
pub trait WebhookHooks: Send + Sync {
    /// A Checkout session completed.
    async fn checkout_completed(&self, _session: &CheckoutSession) -> Result<(), HookError> {
        Ok(())
    }

    /// A subscription was created, updated or deleted.
    async fn subscription_changed(
        &self,
        _change: SubscriptionChange,
        _subscription: &StripeSubscription,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// An invoice was paid.
    async fn invoice_paid(&self, _invoice: &Invoice) -> Result<(), HookError> {
        Ok(())
    }

    /// An invoice payment attempt failed.
    async fn invoice_payment_failed(&self, _invoice: &Invoice) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing beyond the dispatcher's logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl WebhookHooks for NoopHooks {}
