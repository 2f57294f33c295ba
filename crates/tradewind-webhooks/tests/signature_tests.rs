//! Integration tests for outbound signing.
//!
//! A receiver holding the endpoint secret, the timestamp header, and the raw
//! body must reproduce the signature header exactly.

#![cfg(feature = "integration")]

mod common;

use common::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

use tradewind_webhooks::crypto;
use tradewind_webhooks::services::delivery_service::{
    EVENT_TYPE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

#[tokio::test]
async fn test_signature_is_reproducible_from_headers_and_body() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    let capture = CaptureResponder::new();

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    let (_, secret) = ctx.create_endpoint(&url, &["order.created"]).await;
    let event = ctx.publish("order.created", order_payload(41)).await;

    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;
    ctx.run_until_terminal(delivery_id, 3).await;

    let requests = capture.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let signature = request.header(SIGNATURE_HEADER).expect("signature header");
    let timestamp: i64 = request
        .header(TIMESTAMP_HEADER)
        .expect("timestamp header")
        .parse()
        .expect("timestamp header must be epoch millis");

    assert!(crypto::verify_signature(signature, &secret, timestamp, &request.body));
    assert_eq!(
        crypto::compute_signature(&secret, timestamp, &request.body),
        signature
    );
}

#[tokio::test]
async fn test_outbound_request_carries_event_type_and_raw_payload() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    let capture = CaptureResponder::new();

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    ctx.create_endpoint(&url, &["payment.captured"]).await;
    let payload = order_payload(42);
    let event = ctx.publish("payment.captured", payload.clone()).await;

    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;
    ctx.run_until_terminal(delivery_id, 3).await;

    let requests = capture.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    assert_eq!(request.header(EVENT_TYPE_HEADER), Some("payment.captured"));
    assert_eq!(request.header("content-type"), Some("application/json"));

    // The body is the raw event payload, not an envelope.
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body, payload);
}

#[tokio::test]
async fn test_rotation_signs_future_deliveries_with_new_secret() {
    let ctx = TestCtx::new().await;
    let server = MockServer::start().await;
    let capture = CaptureResponder::new();

    Mock::given(method("POST"))
        .respond_with(capture.clone())
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    let (endpoint, old_secret) = ctx.create_endpoint(&url, &["order.created"]).await;

    let new_secret = ctx
        .endpoints
        .rotate_secret(ctx.tenant_id, endpoint.id)
        .await
        .unwrap();
    assert_ne!(old_secret, new_secret);

    let event = ctx.publish("order.created", order_payload(43)).await;
    let delivery_id = ctx.deliveries_for_event(event.id).await[0].id;
    ctx.run_until_terminal(delivery_id, 3).await;

    let request = &capture.requests()[0];
    let signature = request.header(SIGNATURE_HEADER).unwrap();
    let timestamp: i64 = request.header(TIMESTAMP_HEADER).unwrap().parse().unwrap();

    assert!(crypto::verify_signature(signature, &new_secret, timestamp, &request.body));
    assert!(!crypto::verify_signature(signature, &old_secret, timestamp, &request.body));
}
