//! Subscription renewal sweep.
//!
//! Rolls every due subscription into its next billing period. Records are
//! processed one at a time; a failure on one record is logged and counted
//! without stopping the rest of the batch.

use chrono::{DateTime, Utc};
use serde::Serialize;

use billing_edge_store::{RenewOutcome, StoreError, SubscriptionStore};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenewalSummary {
    /// Subscriptions that were due.
    pub matched: usize,
    /// Subscriptions moved into a new period.
    pub renewed: usize,
    /// Subscriptions another run renewed first.
    pub skipped: usize,
    /// Subscriptions that could not be renewed.
    pub failed: usize,
}

/// Renew every subscription due at `now`.
///
/// # Errors
///
/// Returns `StoreError` only if listing due subscriptions fails. Per-record
/// failures are reported through `RenewalSummary::failed`.
pub async fn renew_due_subscriptions(
    store: &dyn SubscriptionStore,
    now: DateTime<Utc>,
) -> Result<RenewalSummary, StoreError> {
    let due = store.list_due(now).await?;
    let mut summary = RenewalSummary {
        matched: due.len(),
        ..RenewalSummary::default()
    };

    tracing::info!(matched = summary.matched, now = %now, "Starting subscription renewal sweep");

    for sub in &due {
        let period = match sub.period().renew_through(sub.interval, now) {
            Ok(period) => period,
            Err(e) => {
                tracing::warn!(
                    subscription_id = %sub.id,
                    error = %e,
                    "Could not compute next billing period"
                );
                summary.failed += 1;
                continue;
            }
        };

        if period.start != sub.current_period_end {
            tracing::warn!(
                subscription_id = %sub.id,
                previous_period_end = %sub.current_period_end,
                period_start = %period.start,
                "Subscription missed renewals; skipping ahead to the current period"
            );
        }

        match store
            .renew(&sub.id, sub.current_period_end, &period, now)
            .await
        {
            Ok(RenewOutcome::Renewed) => {
                tracing::info!(
                    subscription_id = %sub.id,
                    user_id = %sub.user_id,
                    interval = %sub.interval,
                    period_start = %period.start,
                    period_end = %period.end,
                    "Subscription renewed"
                );
                summary.renewed += 1;
            }
            Ok(RenewOutcome::Stale) => {
                tracing::debug!(
                    subscription_id = %sub.id,
                    "Subscription already renewed by another run"
                );
                summary.skipped += 1;
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = %sub.id,
                    error = %e,
                    "Failed to persist renewed billing period"
                );
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        matched = summary.matched,
        renewed = summary.renewed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Subscription renewal sweep finished"
    );

    Ok(summary)
}
