//! Common utilities for tradewind-webhooks integration tests.
//!
//! These tests need a live PostgreSQL instance (`DATABASE_URL`) and run
//! behind the `integration` feature. Each test takes an exclusive guard and
//! starts from truncated subsystem tables, so assertions never see another
//! test's rows.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use uuid::Uuid;
use wiremock::{Request, Respond, ResponseTemplate};

use tradewind_db::models::{WebhookDelivery, WebhookEndpoint, WebhookEvent};
use tradewind_webhooks::services::credential_service::CredentialService;
use tradewind_webhooks::services::delivery_service::DeliveryService;
use tradewind_webhooks::services::endpoint_service::EndpointService;
use tradewind_webhooks::services::event_publisher::EventPublisher;
use tradewind_webhooks::services::replay_service::ReplayService;
use tradewind_webhooks::models::CreateEndpointRequest;

/// Platform key used for secret-at-rest encryption in tests.
pub const TEST_ENCRYPTION_KEY: [u8; 32] = [0x42u8; 32];

static POOL: OnceCell<PgPool> = OnceCell::const_new();
static TEST_LOCK: Mutex<()> = Mutex::const_new(());

async fn shared_pool() -> &'static PgPool {
    POOL.get_or_init(|| async {
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for integration tests");
        let pool = tradewind_db::connect_pool(&url, 5)
            .await
            .expect("failed to connect to test database");
        tradewind_db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        pool
    })
    .await
}

/// Per-test context: exclusive lock, clean tables, and wired services.
pub struct TestCtx {
    pub pool: PgPool,
    pub tenant_id: Uuid,
    pub credentials: CredentialService,
    pub endpoints: EndpointService,
    pub publisher: EventPublisher,
    pub delivery: DeliveryService,
    pub replay: ReplayService,
    _guard: MutexGuard<'static, ()>,
}

impl TestCtx {
    /// Acquire the test lock, truncate subsystem tables, and build services.
    pub async fn new() -> Self {
        let guard = TEST_LOCK.lock().await;
        let pool = shared_pool().await.clone();

        for table in [
            "webhook_deliveries",
            "webhook_events",
            "webhook_endpoints",
            "api_credentials",
        ] {
            sqlx::query(&format!("TRUNCATE {table}"))
                .execute(&pool)
                .await
                .expect("failed to truncate table");
        }

        let key = TEST_ENCRYPTION_KEY.to_vec();
        let (publisher, _notify_rx) = EventPublisher::new(pool.clone(), 16);
        let delivery = DeliveryService::new(pool.clone(), key.clone())
            .expect("failed to build delivery service");

        Self {
            tenant_id: Uuid::new_v4(),
            credentials: CredentialService::new(pool.clone()),
            endpoints: EndpointService::new(pool.clone(), key).with_allow_http(true),
            publisher: publisher.clone(),
            delivery: delivery.clone(),
            replay: ReplayService::new(pool.clone(), delivery),
            pool,
            _guard: guard,
        }
    }

    /// Register an endpoint pointing at a mock server.
    pub async fn create_endpoint(
        &self,
        url: &str,
        event_types: &[&str],
    ) -> (WebhookEndpoint, String) {
        self.endpoints
            .create(
                self.tenant_id,
                CreateEndpointRequest {
                    url: url.to_string(),
                    event_types: event_types.iter().map(|s| s.to_string()).collect(),
                },
            )
            .await
            .expect("failed to create endpoint")
    }

    /// Publish an event for the context tenant.
    pub async fn publish(&self, event_type: &str, payload: serde_json::Value) -> WebhookEvent {
        self.publisher
            .publish(self.tenant_id, event_type, payload)
            .await
            .expect("failed to publish event")
    }

    /// All delivery rows for one event, oldest first.
    pub async fn deliveries_for_event(&self, event_id: Uuid) -> Vec<WebhookDelivery> {
        sqlx::query_as::<_, WebhookDelivery>(
            r#"
            SELECT id, tenant_id, endpoint_id, event_id, event_type, status,
                   attempt_count, response_code, response_snippet, latency_ms,
                   next_retry_at, delivered_at, created_at, updated_at
            FROM webhook_deliveries
            WHERE event_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .expect("failed to query deliveries")
    }

    /// Re-fetch one delivery row.
    pub async fn delivery(&self, id: Uuid) -> WebhookDelivery {
        WebhookDelivery::find_by_id(&self.pool, self.tenant_id, id)
            .await
            .expect("failed to query delivery")
            .expect("delivery row missing")
    }

    /// Force a delivery row back into the due set, ignoring its backoff.
    pub async fn force_due(&self, id: Uuid) {
        sqlx::query(
            "UPDATE webhook_deliveries SET next_retry_at = NOW() - interval '1 second' WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .expect("failed to force delivery due");
    }

    /// Run delivery transitions until the row reaches a terminal state or the
    /// transition budget is spent. Returns the state snapshot after each
    /// transition.
    pub async fn run_until_terminal(
        &self,
        id: Uuid,
        max_transitions: usize,
    ) -> Vec<WebhookDelivery> {
        let mut snapshots = Vec::new();
        for _ in 0..max_transitions {
            self.force_due(id).await;
            self.delivery
                .process_due(10)
                .await
                .expect("failed to process due deliveries");
            let row = self.delivery(id).await;
            let terminal = row.status.is_terminal();
            snapshots.push(row);
            if terminal {
                break;
            }
        }
        snapshots
    }
}

// ---------------------------------------------------------------------------
// Wiremock responders
// ---------------------------------------------------------------------------

/// A captured HTTP request (body + headers).
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl CapturedRequest {
    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Responder that records every request and answers with a fixed status.
#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<StdMutex<Vec<CapturedRequest>>>,
    response_code: u16,
}

impl CaptureResponder {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            requests: Arc::new(StdMutex::new(Vec::new())),
            response_code: status,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.lock().unwrap().push(CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        });
        ResponseTemplate::new(self.response_code)
    }
}

/// Responder that fails `n` times with 500, then returns 200.
#[derive(Clone)]
pub struct FailingResponder {
    seen: Arc<AtomicU32>,
    failures_before_success: u32,
}

impl FailingResponder {
    pub fn fail_times(n: u32) -> Self {
        Self {
            seen: Arc::new(AtomicU32::new(0)),
            failures_before_success: n,
        }
    }

    pub fn request_count(&self) -> u32 {
        self.seen.load(Ordering::SeqCst)
    }
}

impl Respond for FailingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.seen.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

/// Example order payload.
pub fn order_payload(order_number: u32) -> serde_json::Value {
    serde_json::json!({
        "order_number": order_number,
        "currency": "EUR",
        "total_cents": 12_500,
        "lines": [{"sku": "TW-001", "qty": 1}]
    })
}
