//! Subscription renewal cron handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::CronAuth;
use crate::error::ApiError;
use crate::renewal::renew_due_subscriptions;
use crate::state::AppState;

/// Renewal run response.
#[derive(Debug, Serialize)]
pub struct RenewalResponse {
    /// Whether the sweep ran.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Subscriptions that were due.
    pub matched: usize,
    /// Subscriptions renewed.
    pub renewed: usize,
    /// Subscriptions already renewed by a concurrent run.
    pub skipped: usize,
    /// Subscriptions that failed to renew.
    pub failed: usize,
    /// The instant the sweep ran at.
    pub timestamp: DateTime<Utc>,
}

/// Renew every due subscription.
pub async fn renew_subscriptions(
    State(state): State<Arc<AppState>>,
    auth: CronAuth,
) -> Result<Json<RenewalResponse>, ApiError> {
    let store = state
        .store
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Subscription store not configured".into()))?;

    let now = state.clock.now();
    tracing::info!(caller = ?auth.caller, now = %now, "Subscription renewal triggered");

    let summary = renew_due_subscriptions(store.as_ref(), now).await?;

    Ok(Json(RenewalResponse {
        success: true,
        message: format!(
            "Renewed {} of {} due subscriptions",
            summary.renewed, summary.matched
        ),
        matched: summary.matched,
        renewed: summary.renewed,
        skipped: summary.skipped,
        failed: summary.failed,
        timestamp: now,
    }))
}
