//! Integration tests for operator replay.
//!
//! Replay resets the existing row (attempt count 1, status pending) and runs
//! one transition immediately, outside the backoff schedule. It never creates
//! a new row.

#![cfg(feature = "integration")]

mod common;

use common::*;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer};

use tradewind_db::models::{DeliveryStatus, WebhookDelivery};
use tradewind_webhooks::WebhookError;

/// Drive a delivery to `dead` against an always-failing receiver.
async fn dead_delivery(ctx: &TestCtx, url: &str) -> WebhookDelivery {
    ctx.create_endpoint(url, &["order.created"]).await;
    let event = ctx.publish("order.created", order_payload(30)).await;
    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;

    let snapshots = ctx.run_until_terminal(delivery_id, 15).await;
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, DeliveryStatus::Dead);
    last.clone()
}

#[tokio::test]
async fn test_reset_for_replay_restores_pending_with_attempt_one() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(CaptureResponder::with_status(500))
        .mount(&server)
        .await;

    let dead = dead_delivery(&ctx, &format!("{}/hook", server.uri())).await;

    let reset = WebhookDelivery::reset_for_replay(&ctx.pool, ctx.tenant_id, dead.id, 300)
        .await
        .unwrap()
        .expect("row must exist");

    assert_eq!(reset.id, dead.id);
    assert_eq!(reset.status, DeliveryStatus::Pending);
    assert_eq!(reset.attempt_count, 1);
    assert!(reset.next_retry_at.is_some());
}

#[tokio::test]
async fn test_replay_of_dead_delivery_can_succeed() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    // Fails enough to dead-letter, then the endpoint recovers.
    let responder = FailingResponder::fail_times(10);

    Mock::given(method("POST"))
        .respond_with(responder.clone())
        .mount(&server)
        .await;

    let dead = dead_delivery(&ctx, &format!("{}/hook", server.uri())).await;
    assert_eq!(responder.request_count(), 10);

    ctx.replay.replay(ctx.tenant_id, dead.id).await.unwrap();

    let row = ctx.delivery(dead.id).await;
    assert_eq!(row.status, DeliveryStatus::Delivered);
    // Reset to 1, then the immediate transition counted one more.
    assert_eq!(row.attempt_count, 2);
    assert!(row.next_retry_at.is_none());
    assert_eq!(responder.request_count(), 11);
}

#[tokio::test]
async fn test_replay_reuses_the_row() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    let responder = FailingResponder::fail_times(10);

    Mock::given(method("POST"))
        .respond_with(responder.clone())
        .mount(&server)
        .await;

    let dead = dead_delivery(&ctx, &format!("{}/hook", server.uri())).await;
    let event_rows_before = ctx.deliveries_for_event(dead.event_id).await.len();

    ctx.replay.replay(ctx.tenant_id, dead.id).await.unwrap();

    assert_eq!(
        ctx.deliveries_for_event(dead.event_id).await.len(),
        event_rows_before,
        "replay must not create a new delivery row"
    );
}

#[tokio::test]
async fn test_replay_unknown_delivery_is_not_found() {
    let ctx = TestCtx::new().await;

    let result = ctx.replay.replay(ctx.tenant_id, uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(WebhookError::DeliveryNotFound)));
}

#[tokio::test]
async fn test_replay_is_tenant_scoped() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(CaptureResponder::with_status(500))
        .mount(&server)
        .await;

    let dead = dead_delivery(&ctx, &format!("{}/hook", server.uri())).await;

    let result = ctx.replay.replay(uuid::Uuid::new_v4(), dead.id).await;
    assert!(matches!(result, Err(WebhookError::DeliveryNotFound)));
}
