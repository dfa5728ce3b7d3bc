//! In-memory storage implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use billing_edge_core::{BillingPeriod, Subscription, SubscriptionId};

use crate::error::Result;
use crate::{RenewOutcome, SubscriptionStore};

/// Subscription store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given subscriptions.
    #[must_use]
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let map = subscriptions.into_iter().map(|s| (s.id, s)).collect();
        Self {
            subscriptions: RwLock::new(map),
        }
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        let mut due: Vec<_> = subscriptions
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|s| (s.current_period_end, s.id));
        Ok(due)
    }

    async fn renew(
        &self,
        id: &SubscriptionId,
        expected_end: DateTime<Utc>,
        period: &BillingPeriod,
        updated_at: DateTime<Utc>,
    ) -> Result<RenewOutcome> {
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions.get_mut(id) {
            Some(sub) if sub.current_period_end == expected_end => {
                sub.current_period_start = period.start;
                sub.current_period_end = period.end;
                sub.updated_at = updated_at;
                Ok(RenewOutcome::Renewed)
            }
            _ => Ok(RenewOutcome::Stale),
        }
    }

    async fn get(&self, id: &SubscriptionId) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription.clone());
        Ok(())
    }
}
