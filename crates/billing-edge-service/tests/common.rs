//! Common test utilities for billing-edge integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};

use billing_edge_core::{
    BillingInterval, BillingPeriod, Subscription, SubscriptionId, SubscriptionStatus, UserId,
};
use billing_edge_service::stripe::{sign, CheckoutSession, Invoice, StripeSubscription};
use billing_edge_service::{
    create_router, AppState, FixedClock, HookError, ServiceConfig, SubscriptionChange,
    WebhookHooks,
};
use billing_edge_store::{MemoryStore, RenewOutcome, StoreError, SubscriptionStore};

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const CRON_SECRET: &str = "cron-integration-secret";

/// The instant the harness clock starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(value).expect("valid header value"),
    )
}

/// Hooks that record which methods ran.
#[derive(Default)]
pub struct RecordingHooks {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingHooks {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), HookError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(HookError("hook failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WebhookHooks for RecordingHooks {
    async fn checkout_completed(&self, session: &CheckoutSession) -> Result<(), HookError> {
        self.record(format!("checkout_completed:{}", session.id))
    }

    async fn subscription_changed(
        &self,
        change: SubscriptionChange,
        subscription: &StripeSubscription,
    ) -> Result<(), HookError> {
        self.record(format!("subscription_{change:?}:{}", subscription.id))
    }

    async fn invoice_paid(&self, invoice: &Invoice) -> Result<(), HookError> {
        self.record(format!("invoice_paid:{}", invoice.id))
    }

    async fn invoice_payment_failed(&self, invoice: &Invoice) -> Result<(), HookError> {
        self.record(format!("invoice_payment_failed:{}", invoice.id))
    }
}

/// A store whose renewals fail for chosen subscriptions.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing: Vec<SubscriptionId>,
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn list_due(&self, now: DateTime<Utc>) -> billing_edge_store::Result<Vec<Subscription>> {
        self.inner.list_due(now).await
    }

    async fn renew(
        &self,
        id: &SubscriptionId,
        expected_end: DateTime<Utc>,
        period: &BillingPeriod,
        updated_at: DateTime<Utc>,
    ) -> billing_edge_store::Result<RenewOutcome> {
        if self.failing.contains(id) {
            return Err(StoreError::Database("connection reset".into()));
        }
        self.inner.renew(id, expected_end, period, updated_at).await
    }

    async fn get(&self, id: &SubscriptionId) -> billing_edge_store::Result<Option<Subscription>> {
        self.inner.get(id).await
    }

    async fn upsert(&self, subscription: &Subscription) -> billing_edge_store::Result<()> {
        self.inner.upsert(subscription).await
    }
}

/// A store whose queries always fail.
pub struct BrokenStore;

#[async_trait]
impl SubscriptionStore for BrokenStore {
    async fn list_due(&self, _now: DateTime<Utc>) -> billing_edge_store::Result<Vec<Subscription>> {
        Err(StoreError::Database("relation \"subscriptions\" does not exist".into()))
    }

    async fn renew(
        &self,
        _id: &SubscriptionId,
        _expected_end: DateTime<Utc>,
        _period: &BillingPeriod,
        _updated_at: DateTime<Utc>,
    ) -> billing_edge_store::Result<RenewOutcome> {
        Err(StoreError::Database("unreachable".into()))
    }

    async fn get(&self, _id: &SubscriptionId) -> billing_edge_store::Result<Option<Subscription>> {
        Ok(None)
    }

    async fn upsert(&self, _subscription: &Subscription) -> billing_edge_store::Result<()> {
        Ok(())
    }
}

/// An empty store whose `list_due` takes a while and tracks overlapping calls.
#[derive(Default)]
pub struct SlowStore {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowStore {
    /// The most `list_due` calls that ran at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionStore for SlowStore {
    async fn list_due(&self, _now: DateTime<Utc>) -> billing_edge_store::Result<Vec<Subscription>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn renew(
        &self,
        _id: &SubscriptionId,
        _expected_end: DateTime<Utc>,
        _period: &BillingPeriod,
        _updated_at: DateTime<Utc>,
    ) -> billing_edge_store::Result<RenewOutcome> {
        Ok(RenewOutcome::Stale)
    }

    async fn get(&self, _id: &SubscriptionId) -> billing_edge_store::Result<Option<Subscription>> {
        Ok(None)
    }

    async fn upsert(&self, _subscription: &Subscription) -> billing_edge_store::Result<()> {
        Ok(())
    }
}

/// An active subscription whose current period ends at `end`.
pub fn subscription(interval: BillingInterval, end: DateTime<Utc>) -> Subscription {
    let start = match interval {
        BillingInterval::Month => end - chrono::Duration::days(30),
        BillingInterval::Year => end - chrono::Duration::days(365),
    };
    Subscription {
        id: SubscriptionId::generate(),
        user_id: UserId::generate(),
        product_name: "Storefront Pro".into(),
        interval,
        status: SubscriptionStatus::Active,
        cancel_at_period_end: false,
        current_period_start: start,
        current_period_end: end,
        updated_at: start,
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server.
    pub store: Arc<dyn SubscriptionStore>,
    /// The clock behind the server.
    pub clock: Arc<FixedClock>,
    /// Hooks the webhook dispatcher calls.
    pub hooks: Arc<RecordingHooks>,
}

impl TestHarness {
    /// Create a harness with an empty in-memory store and all secrets configured.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create a harness backed by `store`.
    pub fn with_store(store: Arc<dyn SubscriptionStore>) -> Self {
        Self::build(test_config(), Some(store), Arc::new(RecordingHooks::default()))
    }

    /// Create a harness with custom configuration and hooks.
    pub fn build(
        config: ServiceConfig,
        store: Option<Arc<dyn SubscriptionStore>>,
        hooks: Arc<RecordingHooks>,
    ) -> Self {
        let clock = Arc::new(FixedClock::new(start_time()));
        let state = AppState::new(config, store.clone())
            .with_clock(clock.clone())
            .with_hooks(hooks.clone());
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store: store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            clock,
            hooks,
        }
    }

    /// A `Stripe-Signature` header for `body` signed at the harness clock's time.
    pub fn signature_for(&self, body: &[u8]) -> String {
        use billing_edge_service::Clock;
        sign(WEBHOOK_SECRET, self.clock.now().timestamp(), body)
    }

    /// The cron bearer authorization header value.
    pub fn cron_auth_header() -> String {
        format!("Bearer {CRON_SECRET}")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration with every secret set.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
        cron_secret: Some(CRON_SECRET.into()),
        ..ServiceConfig::default()
    }
}

/// A serialized Stripe event.
pub fn stripe_event(event_type: &str, object: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": "evt_integration",
        "object": "event",
        "type": event_type,
        "created": start_time().timestamp(),
        "livemode": false,
        "data": { "object": object }
    }))
    .expect("serialize event")
}
