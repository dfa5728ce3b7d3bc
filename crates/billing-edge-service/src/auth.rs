//! Authorization for scheduler-invoked routes.
//!
//! `CronAuth` accepts a request when either
//!
//! - the configured scheduler marker header is present and trusted, or
//! - `Authorization: Bearer <token>` matches the configured cron secret.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// How a cron request was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronCaller {
    /// The hosting platform's scheduler.
    Scheduler,
    /// A caller presenting the shared cron secret.
    Bearer,
}

/// An authorized cron invocation.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth {
    /// Who made the call.
    pub caller: CronCaller,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CronAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = authorize_cron(&parts.headers, &state.config).ok_or_else(|| {
            tracing::warn!("Rejected unauthorized cron request");
            ApiError::Unauthorized
        })?;
        Ok(Self { caller })
    }
}

/// Decide whether `headers` authorize a cron call under `config`.
#[must_use]
pub fn authorize_cron(headers: &HeaderMap, config: &ServiceConfig) -> Option<CronCaller> {
    // A matching bearer token is preferred so the log shows the stronger credential.
    if let Some(secret) = config.cron_secret.as_deref() {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if token.is_some_and(|t| tokens_match(t, secret)) {
            return Some(CronCaller::Bearer);
        }
    }

    if config.cron_trust_scheduler_header
        && headers.contains_key(config.cron_scheduler_header.as_str())
    {
        return Some(CronCaller::Scheduler);
    }

    None
}

fn tokens_match(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
