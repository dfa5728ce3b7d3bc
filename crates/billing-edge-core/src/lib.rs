//! Core types for billing-edge.
//!
//! This crate provides the domain types shared by the store and the HTTP service:
//!
//! - **Identifiers**: `SubscriptionId`, `UserId`
//! - **Subscriptions**: `Subscription`, `SubscriptionStatus`, `BillingInterval`
//! - **Periods**: `BillingPeriod` and the calendar arithmetic used by renewals

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod period;
pub mod subscription;

pub use error::{BillingError, Result};
pub use ids::{IdError, SubscriptionId, UserId};
pub use period::{BillingPeriod, MAX_CATCH_UP_PERIODS};
pub use subscription::{BillingInterval, Subscription, SubscriptionStatus};
