//! API handlers.

pub mod health;
pub mod renewals;
pub mod webhooks;
