//! Integration tests for retry scheduling and dead-lettering.
//!
//! An always-failing receiver must exhaust exactly the attempt cap, with
//! non-decreasing backoff delays capped at sixty minutes.

#![cfg(feature = "integration")]

mod common;

use common::*;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer};

use tradewind_db::models::DeliveryStatus;
use tradewind_webhooks::services::delivery_service::{
    plan_failure, retry_backoff, FailureDisposition, DEFAULT_MAX_ATTEMPTS,
};

#[tokio::test]
async fn test_always_failing_receiver_dead_letters_after_max_attempts() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    let capture = CaptureResponder::with_status(500);

    Mock::given(method("POST"))
        .respond_with(capture.clone())
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    ctx.create_endpoint(&url, &["order.created"]).await;
    let event = ctx.publish("order.created", order_payload(20)).await;

    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;
    let snapshots = ctx
        .run_until_terminal(delivery_id, DEFAULT_MAX_ATTEMPTS as usize + 5)
        .await;

    // Exactly max_attempts transitions: 9 failed, the 10th dead.
    assert_eq!(snapshots.len(), DEFAULT_MAX_ATTEMPTS as usize);
    for snapshot in &snapshots[..snapshots.len() - 1] {
        assert_eq!(snapshot.status, DeliveryStatus::Failed);
    }

    let last = snapshots.last().unwrap();
    assert_eq!(last.status, DeliveryStatus::Dead);
    assert_eq!(last.attempt_count, DEFAULT_MAX_ATTEMPTS);
    assert!(last.next_retry_at.is_none());
    assert_eq!(capture.request_count() as i32, DEFAULT_MAX_ATTEMPTS);
}

#[tokio::test]
async fn test_scheduled_backoff_grows_and_caps() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(CaptureResponder::with_status(500))
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    ctx.create_endpoint(&url, &["order.created"]).await;
    let event = ctx.publish("order.created", order_payload(21)).await;
    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;

    let mut last_delay_secs = 0i64;
    for attempt in 1..DEFAULT_MAX_ATTEMPTS {
        ctx.force_due(delivery_id).await;
        ctx.delivery.process_due(10).await.unwrap();

        let row = ctx.delivery(delivery_id).await;
        assert_eq!(row.status, DeliveryStatus::Failed);
        assert_eq!(row.attempt_count, attempt);

        let delay_secs = (row.next_retry_at.unwrap() - chrono::Utc::now()).num_seconds();
        let expected_secs = retry_backoff(attempt).num_seconds();

        // Small tolerance for the time spent between update and assertion.
        assert!(
            (delay_secs - expected_secs).abs() <= 5,
            "attempt {attempt}: scheduled {delay_secs}s, expected ~{expected_secs}s"
        );
        assert!(delay_secs >= last_delay_secs - 5, "backoff shrank at {attempt}");
        assert!(delay_secs <= 60 * 60 + 5, "backoff exceeded the 60-minute cap");
        last_delay_secs = delay_secs;
    }
}

#[tokio::test]
async fn test_rows_on_backoff_are_not_claimed() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    let capture = CaptureResponder::with_status(500);

    Mock::given(method("POST"))
        .respond_with(capture.clone())
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    ctx.create_endpoint(&url, &["order.created"]).await;
    let event = ctx.publish("order.created", order_payload(22)).await;
    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;

    ctx.force_due(delivery_id).await;
    ctx.delivery.process_due(10).await.unwrap();
    assert_eq!(capture.request_count(), 1);

    // The row is now scheduled minutes out; another pass must not touch it.
    let processed = ctx.delivery.process_due(10).await.unwrap();
    assert_eq!(processed, 0);
    assert_eq!(capture.request_count(), 1);
}

#[tokio::test]
async fn test_failure_plan_matches_engine_constants() {
    assert!(matches!(
        plan_failure(1, DEFAULT_MAX_ATTEMPTS),
        FailureDisposition::Retry(_)
    ));
    assert_eq!(
        plan_failure(DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS),
        FailureDisposition::Dead
    );
}
