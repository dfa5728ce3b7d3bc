//! Subscription renewal cron integration tests.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use billing_edge_core::BillingInterval;
use billing_edge_store::{MemoryStore, SubscriptionStore};

use common::{
    at, header, subscription, test_config, BrokenStore, FlakyStore, RecordingHooks, SlowStore,
    TestHarness,
};

const RENEW_PATH: &str = "/api/cron/renew-subscriptions";

async fn call_authorized(harness: &TestHarness) -> axum_test::TestResponse {
    let (name, value) = header("authorization", &TestHarness::cron_auth_header());
    harness.server.get(RENEW_PATH).add_header(name, value).await
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn unauthenticated_call_is_rejected() {
    let harness = TestHarness::new();

    let response = harness.server.get(RENEW_PATH).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn wrong_bearer_token_is_rejected() {
    let harness = TestHarness::new();
    let (name, value) = header("authorization", "Bearer not-the-secret");

    let response = harness.server.get(RENEW_PATH).add_header(name, value).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_is_accepted_on_get_and_post() {
    let harness = TestHarness::new();

    call_authorized(&harness).await.assert_status_ok();

    let (name, value) = header("authorization", &TestHarness::cron_auth_header());
    harness
        .server
        .post(RENEW_PATH)
        .add_header(name, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn scheduler_header_is_accepted() {
    let harness = TestHarness::new();
    let (name, value) = header("x-vercel-cron", "1");

    let response = harness.server.get(RENEW_PATH).add_header(name, value).await;

    response.assert_status_ok();
}

#[tokio::test]
async fn untrusted_scheduler_header_is_rejected() {
    let config = billing_edge_service::ServiceConfig {
        cron_trust_scheduler_header: false,
        ..test_config()
    };
    let store: Arc<dyn SubscriptionStore> = Arc::new(MemoryStore::new());
    let harness = TestHarness::build(config, Some(store), Arc::new(RecordingHooks::default()));
    let (name, value) = header("x-vercel-cron", "1");

    let response = harness.server.get(RENEW_PATH).add_header(name, value).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let harness = TestHarness::new();

    let response = harness.server.put(RENEW_PATH).await;

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

// ============================================================================
// Renewal
// ============================================================================

#[tokio::test]
async fn empty_store_reports_zero_renewals() {
    let harness = TestHarness::new();

    let response = call_authorized(&harness).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["matched"], 0);
    assert_eq!(body["renewed"], 0);
    assert_eq!(body["message"], "Renewed 0 of 0 due subscriptions");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn due_subscriptions_roll_into_next_period() {
    let yearly = subscription(BillingInterval::Year, at(2024, 1, 15));
    let monthly = subscription(BillingInterval::Month, at(2024, 1, 31));
    let not_due = subscription(BillingInterval::Month, at(2024, 2, 20));
    let store = Arc::new(MemoryStore::with_subscriptions([
        yearly.clone(),
        monthly.clone(),
        not_due.clone(),
    ]));
    let harness = TestHarness::with_store(store.clone());

    let response = call_authorized(&harness).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["matched"], 2);
    assert_eq!(body["renewed"], 2);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["message"], "Renewed 2 of 2 due subscriptions");

    let stored = store.get(&yearly.id).await.unwrap().unwrap();
    assert_eq!(stored.current_period_start, at(2024, 1, 15));
    assert_eq!(stored.current_period_end, at(2025, 1, 15));

    let stored = store.get(&monthly.id).await.unwrap().unwrap();
    assert_eq!(stored.current_period_start, at(2024, 1, 31));
    assert_eq!(stored.current_period_end, at(2024, 2, 29));

    let stored = store.get(&not_due.id).await.unwrap().unwrap();
    assert_eq!(stored.current_period_end, at(2024, 2, 20));
}

#[tokio::test]
async fn repeated_call_renews_nothing() {
    let store = Arc::new(MemoryStore::with_subscriptions([subscription(
        BillingInterval::Month,
        at(2024, 1, 1),
    )]));
    let harness = TestHarness::with_store(store);

    let first: serde_json::Value = call_authorized(&harness).await.json();
    assert_eq!(first["renewed"], 1);

    let second: serde_json::Value = call_authorized(&harness).await.json();
    assert_eq!(second["matched"], 0);
    assert_eq!(second["renewed"], 0);
}

#[tokio::test]
async fn subscription_becomes_due_again_as_time_passes() {
    let sub = subscription(BillingInterval::Month, at(2024, 1, 20));
    let store = Arc::new(MemoryStore::with_subscriptions([sub.clone()]));
    let harness = TestHarness::with_store(store.clone());

    call_authorized(&harness).await.assert_status_ok();
    let stored = store.get(&sub.id).await.unwrap().unwrap();
    assert_eq!(stored.current_period_end, at(2024, 2, 20));

    harness.clock.set(at(2024, 2, 21));
    let body: serde_json::Value = call_authorized(&harness).await.json();
    assert_eq!(body["renewed"], 1);

    let stored = store.get(&sub.id).await.unwrap().unwrap();
    assert_eq!(stored.current_period_start, at(2024, 2, 20));
    assert_eq!(stored.current_period_end, at(2024, 3, 20));
}

#[tokio::test]
async fn partial_failure_still_succeeds() {
    let good = subscription(BillingInterval::Month, at(2024, 1, 10));
    let bad = subscription(BillingInterval::Year, at(2024, 1, 12));
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::with_subscriptions([good.clone(), bad.clone()]),
        failing: vec![bad.id],
    });
    let harness = TestHarness::with_store(store.clone());

    let response = call_authorized(&harness).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["matched"], 2);
    assert_eq!(body["renewed"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["message"], "Renewed 1 of 2 due subscriptions");

    let stored = store.inner.get(&bad.id).await.unwrap().unwrap();
    assert_eq!(stored.current_period_end, at(2024, 1, 12));
}

#[tokio::test]
async fn store_failure_is_generic_internal_error() {
    let harness = TestHarness::with_store(Arc::new(BrokenStore));

    let response = call_authorized(&harness).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "internal_error");
    assert_eq!(body["error"]["message"], "An internal error occurred");
    assert!(!response.text().contains("subscriptions"));
}

#[tokio::test]
async fn missing_store_is_internal_error() {
    let harness = TestHarness::build(test_config(), None, Arc::new(RecordingHooks::default()));

    let response = call_authorized(&harness).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn concurrent_get_and_post_sweeps_run_one_at_a_time() {
    let store = Arc::new(SlowStore::default());
    let harness = TestHarness::with_store(store.clone());
    let auth = TestHarness::cron_auth_header();

    let (get_name, get_value) = header("authorization", &auth);
    let (post_name, post_value) = header("authorization", &auth);
    let get = harness.server.get(RENEW_PATH).add_header(get_name, get_value);
    let post = harness.server.post(RENEW_PATH).add_header(post_name, post_value);

    let (get_response, post_response) = tokio::join!(async { get.await }, async { post.await });

    get_response.assert_status_ok();
    post_response.assert_status_ok();
    assert_eq!(store.max_in_flight(), 1);
}
