//! Stripe webhook support.
//!
//! - `signature`: verifies the `Stripe-Signature` header over the raw body
//! - `events`: the typed event model dispatched by the webhook handler

pub mod events;
pub mod signature;

pub use events::{
    CheckoutSession, CustomerDetails, Event, EventError, EventPayload, Invoice, OrderSummary,
    StripeSubscription,
};
pub use signature::{sign, SignatureError, SignatureHeader, WebhookVerifier};
