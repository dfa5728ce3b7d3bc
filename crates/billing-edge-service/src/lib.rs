//! Billing Edge HTTP service.
//!
//! This crate provides the two backend endpoints behind the storefront:
//!
//! - Stripe webhook verification and event dispatch
//! - Scheduled subscription renewal
//!
//! # Authentication
//!
//! 1. **Stripe signatures** - webhooks carry an HMAC-SHA256 `Stripe-Signature`
//!    header computed over the raw body
//! 2. **Cron credentials** - the renewal route accepts the hosting scheduler's
//!    marker header or a bearer token matching `CRON_SECRET`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for the Handler trait

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod renewal;
pub mod routes;
pub mod state;
pub mod stripe;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use hooks::{HookError, NoopHooks, SubscriptionChange, WebhookHooks};
pub use renewal::{renew_due_subscriptions, RenewalSummary};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{SignatureError, WebhookVerifier};
