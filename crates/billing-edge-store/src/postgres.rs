//! PostgreSQL storage implementation.
//!
//! Targets the hosted `subscriptions` table. Columns holding enumerations
//! (`billing_interval`, `status`) are plain text so rows written by other
//! systems with unexpected values still load.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use billing_edge_core::{
    BillingInterval, BillingPeriod, Subscription, SubscriptionId, SubscriptionStatus, UserId,
};

use crate::error::Result;
use crate::{RenewOutcome, SubscriptionStore};

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

const SELECT_COLUMNS: &str = "id, user_id, product_name, billing_interval, status, \
     cancel_at_period_end, current_period_start, current_period_end, updated_at";

/// Status filter for due rows. Matches `SubscriptionStatus::from`, which
/// trims and lowercases before comparing.
const DUE_STATUS_PREDICATE: &str = "lower(btrim(status)) = 'active'";

/// PostgreSQL-backed subscription store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Migration` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Subscription schema migrations applied");
        Ok(())
    }

    fn map_row(row: &PgRow) -> Result<Subscription> {
        let interval: String = row.try_get("billing_interval")?;
        let status: String = row.try_get("status")?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            product_name: row.try_get("product_name")?,
            interval: BillingInterval::from(interval),
            status: SubscriptionStatus::from(status),
            cancel_at_period_end: row.try_get("cancel_at_period_end")?,
            current_period_start: row.try_get("current_period_start")?,
            current_period_end: row.try_get("current_period_end")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions \
             WHERE {DUE_STATUS_PREDICATE} AND cancel_at_period_end = FALSE \
             AND current_period_end <= $1 \
             ORDER BY current_period_end, id"
        );
        let rows = sqlx::query(&sql).bind(now).fetch_all(&self.pool).await?;

        tracing::debug!(count = rows.len(), now = %now, "Fetched due subscriptions");

        rows.iter().map(Self::map_row).collect()
    }

    async fn renew(
        &self,
        id: &SubscriptionId,
        expected_end: DateTime<Utc>,
        period: &BillingPeriod,
        updated_at: DateTime<Utc>,
    ) -> Result<RenewOutcome> {
        let result = sqlx::query(
            "UPDATE subscriptions \
             SET current_period_start = $2, current_period_end = $3, updated_at = $4 \
             WHERE id = $1 AND current_period_end = $5",
        )
        .bind(id.as_uuid())
        .bind(period.start)
        .bind(period.end)
        .bind(updated_at)
        .bind(expected_end)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            RenewOutcome::Stale
        } else {
            RenewOutcome::Renewed
        })
    }

    async fn get(&self, id: &SubscriptionId) -> Result<Option<Subscription>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM subscriptions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            "INSERT INTO subscriptions (id, user_id, product_name, billing_interval, status, \
                 cancel_at_period_end, current_period_start, current_period_end, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                 user_id = EXCLUDED.user_id, \
                 product_name = EXCLUDED.product_name, \
                 billing_interval = EXCLUDED.billing_interval, \
                 status = EXCLUDED.status, \
                 cancel_at_period_end = EXCLUDED.cancel_at_period_end, \
                 current_period_start = EXCLUDED.current_period_start, \
                 current_period_end = EXCLUDED.current_period_end, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(&subscription.product_name)
        .bind(subscription.interval.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.current_period_start)
        .bind(subscription.current_period_end)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
