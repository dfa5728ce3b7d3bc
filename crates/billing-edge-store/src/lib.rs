//! Subscription storage for billing-edge.
//!
//! This crate defines the `SubscriptionStore` trait used by the renewal sweep
//! and two backends:
//!
//! - `PgStore`: the hosted PostgreSQL `subscriptions` table, via `sqlx`
//! - `MemoryStore`: an in-process map for tests and local runs
//!
//! # Example
//!
//! ```no_run
//! use billing_edge_store::{PgStore, SubscriptionStore};
//!
//! # async fn run() -> billing_edge_store::Result<()> {
//! let store = PgStore::connect("postgres://localhost/billing", 5).await?;
//! let due = store.list_due(chrono::Utc::now()).await?;
//! println!("{} subscriptions due", due.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use billing_edge_core::{BillingPeriod, Subscription, SubscriptionId};

/// Outcome of a conditional renewal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// The period was written.
    Renewed,
    /// The row no longer had the expected period end (renewed elsewhere, or gone).
    Stale,
}

/// The storage trait for subscription records.
///
/// Every write touches a single row; backends need single-row atomicity only.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// List subscriptions due for renewal at `now`, oldest period end first.
    ///
    /// Due means active, not cancelling at period end, and
    /// `current_period_end <= now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>>;

    /// Replace a subscription's billing period if its end is still `expected_end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    async fn renew(
        &self,
        id: &SubscriptionId,
        expected_end: DateTime<Utc>,
        period: &BillingPeriod,
        updated_at: DateTime<Utc>,
    ) -> Result<RenewOutcome>;

    /// Get a subscription by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get(&self, id: &SubscriptionId) -> Result<Option<Subscription>>;

    /// Insert or replace a subscription record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    async fn upsert(&self, subscription: &Subscription) -> Result<()>;
}
