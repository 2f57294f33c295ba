//! Webhook delivery execution.
//!
//! Owns the delivery state machine (`pending → delivered | failed | dead`):
//! claims due rows, signs payloads with the endpoint secret, executes the
//! HTTP POST, and records the outcome. Failures land only on the delivery row
//! itself — no caller ever waits on a delivery.

use std::time::Instant;

use chrono::{Duration, Utc};
use reqwest::Client;
use sqlx::PgPool;
use uuid::Uuid;

use crate::crypto;
use crate::error::WebhookError;
use tradewind_db::models::{WebhookDelivery, WebhookEndpoint, WebhookEvent};

/// Maximum delivery attempts before dead-lettering.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 10;

/// Upper bound on the exponential backoff, in minutes.
pub const BACKOFF_CAP_MINUTES: i64 = 60;

/// Outbound request timeout, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Lease taken when claiming a row: a worker that crashes mid-transition
/// leaves the row to become eligible again once this lapses.
pub const CLAIM_LEASE_SECONDS: i64 = 300;

/// Maximum characters kept of a response body or error message.
const SNIPPET_MAX_CHARS: usize = 500;

/// Signature header: hex HMAC-SHA256 over `"{timestamp}.{body}"`.
pub const SIGNATURE_HEADER: &str = "X-Tradewind-Signature";
/// Timestamp header: milliseconds since epoch, the same value that was signed.
pub const TIMESTAMP_HEADER: &str = "X-Tradewind-Timestamp";
/// Event type header.
pub const EVENT_TYPE_HEADER: &str = "X-Tradewind-Event-Type";

/// What a failed transition does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Schedule another attempt after the given delay.
    Retry(Duration),
    /// Retries exhausted: dead-letter the row.
    Dead,
}

/// Backoff before the attempt after `attempt_count` failures:
/// `min(2^attempt_count, 60)` minutes.
#[must_use]
pub fn retry_backoff(attempt_count: i32) -> Duration {
    let exponent = attempt_count.clamp(0, 6) as u32;
    let minutes = i64::from(2u32.pow(exponent)).min(BACKOFF_CAP_MINUTES);
    Duration::minutes(minutes)
}

/// Decide the fate of a failed transition that brought the attempt count to
/// `attempt_count`.
#[must_use]
pub fn plan_failure(attempt_count: i32, max_attempts: i32) -> FailureDisposition {
    if attempt_count >= max_attempts {
        FailureDisposition::Dead
    } else {
        FailureDisposition::Retry(retry_backoff(attempt_count))
    }
}

fn truncate_snippet(s: &str) -> String {
    s.chars().take(SNIPPET_MAX_CHARS).collect()
}

/// Service executing delivery transitions.
#[derive(Clone)]
pub struct DeliveryService {
    pool: PgPool,
    http_client: Client,
    encryption_key: Vec<u8>,
    max_attempts: i32,
}

impl DeliveryService {
    /// Create a delivery service with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Internal` if the HTTP client cannot be built.
    pub fn new(pool: PgPool, encryption_key: Vec<u8>) -> Result<Self, WebhookError> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("tradewind-webhooks/1.0")
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| WebhookError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            pool,
            http_client,
            encryption_key,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Set the maximum delivery attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max: i32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Get a reference to the connection pool (for the worker).
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Claim up to `batch` due rows and process them concurrently.
    ///
    /// Returns how many rows were claimed so the worker can keep draining a
    /// backlog. Each row is processed by its own task; the outbound call is
    /// the only suspension point and is time-bounded, so one slow endpoint
    /// cannot hold up the rest of the batch.
    pub async fn process_due(&self, batch: i64) -> Result<usize, WebhookError> {
        let claimed = WebhookDelivery::claim_due(&self.pool, batch, CLAIM_LEASE_SECONDS).await?;
        let count = claimed.len();
        if count == 0 {
            return Ok(0);
        }

        let mut tasks = tokio::task::JoinSet::new();
        for delivery in claimed {
            let service = self.clone();
            tasks.spawn(async move {
                service.execute(&delivery).await;
            });
        }
        while tasks.join_next().await.is_some() {}

        Ok(count)
    }

    /// Execute one delivery transition against a claimed row.
    ///
    /// Every executed transition increments the attempt count; a 2xx response
    /// is terminal success, anything else either schedules a retry or
    /// dead-letters once `max_attempts` is reached. Missing parents (endpoint
    /// or event deleted since fan-out) dead-letter immediately — retrying
    /// cannot help a data-integrity failure.
    pub async fn execute(&self, delivery: &WebhookDelivery) {
        let attempt = delivery.attempt_count + 1;

        let endpoint = match WebhookEndpoint::find_for_delivery(&self.pool, delivery.endpoint_id)
            .await
        {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                self.finish_dead(delivery, attempt, None, "Endpoint no longer exists", None)
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    error = %e,
                    "Failed to load endpoint; row stays claimed until lease lapses"
                );
                return;
            }
        };

        let event = match WebhookEvent::find_for_delivery(&self.pool, delivery.event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.finish_dead(delivery, attempt, None, "Event record no longer exists", None)
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    error = %e,
                    "Failed to load event; row stays claimed until lease lapses"
                );
                return;
            }
        };

        let secret = match crypto::decrypt_secret(&endpoint.secret_encrypted, &self.encryption_key)
        {
            Ok(secret) => secret,
            Err(e) => {
                // Wrong or rotated platform key: retrying cannot help, but an
                // operator can replay after fixing the key material.
                self.finish_dead(
                    delivery,
                    attempt,
                    None,
                    &format!("Signing secret could not be decrypted: {e}"),
                    None,
                )
                .await;
                return;
            }
        };

        let body = match serde_json::to_vec(&event.payload) {
            Ok(body) => body,
            Err(e) => {
                self.finish_dead(
                    delivery,
                    attempt,
                    None,
                    &format!("Failed to serialize payload: {e}"),
                    None,
                )
                .await;
                return;
            }
        };

        let timestamp = Utc::now().timestamp_millis();
        let signature = crypto::compute_signature(&secret, timestamp, &body);

        let start = Instant::now();
        let result = self
            .http_client
            .post(&endpoint.url)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .header(EVENT_TYPE_HEADER, event.event_type.as_str())
            .body(body)
            .send()
            .await;
        let latency_ms = start.elapsed().as_millis() as i32;

        match result {
            Ok(response) => {
                let status = i32::from(response.status().as_u16());
                if (200..300).contains(&status) {
                    self.finish_delivered(delivery, attempt, status, latency_ms)
                        .await;
                } else {
                    let body_snippet = response.text().await.unwrap_or_default();
                    self.finish_failed(
                        delivery,
                        attempt,
                        Some(status),
                        &format!("HTTP {status}: {body_snippet}"),
                        Some(latency_ms),
                    )
                    .await;
                }
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Request timeout ({REQUEST_TIMEOUT_SECS}s)")
                } else if e.is_connect() {
                    format!("Connection failed: {e}")
                } else {
                    format!("Request error: {e}")
                };
                self.finish_failed(delivery, attempt, None, &message, Some(latency_ms))
                    .await;
            }
        }
    }

    /// Record a terminal success.
    async fn finish_delivered(
        &self,
        delivery: &WebhookDelivery,
        attempt: i32,
        response_code: i32,
        latency_ms: i32,
    ) {
        tracing::info!(
            target: "webhook_delivery",
            delivery_id = %delivery.id,
            endpoint_id = %delivery.endpoint_id,
            tenant_id = %delivery.tenant_id,
            event_id = %delivery.event_id,
            event_type = %delivery.event_type,
            response_code,
            latency_ms,
            attempt_count = attempt,
            "Webhook delivered"
        );

        if let Err(e) =
            WebhookDelivery::mark_delivered(&self.pool, delivery.id, attempt, response_code, latency_ms)
                .await
        {
            self.log_update_failure(delivery.id, &e);
        }
    }

    /// Record a failed transition: retry schedule or dead letter.
    async fn finish_failed(
        &self,
        delivery: &WebhookDelivery,
        attempt: i32,
        response_code: Option<i32>,
        message: &str,
        latency_ms: Option<i32>,
    ) {
        match plan_failure(attempt, self.max_attempts) {
            FailureDisposition::Retry(backoff) => {
                let next_retry_at = Utc::now() + backoff;

                tracing::warn!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    endpoint_id = %delivery.endpoint_id,
                    tenant_id = %delivery.tenant_id,
                    event_id = %delivery.event_id,
                    error = %message,
                    attempt_count = attempt,
                    next_retry_at = %next_retry_at,
                    "Webhook delivery failed; retry scheduled"
                );

                if let Err(e) = WebhookDelivery::mark_failed(
                    &self.pool,
                    delivery.id,
                    attempt,
                    response_code,
                    &truncate_snippet(message),
                    latency_ms,
                    next_retry_at,
                )
                .await
                {
                    self.log_update_failure(delivery.id, &e);
                }
            }
            FailureDisposition::Dead => {
                self.finish_dead(delivery, attempt, response_code, message, latency_ms)
                    .await;
            }
        }
    }

    /// Dead-letter a delivery. Terminal and human-visible via the listing;
    /// only operator replay revives it.
    async fn finish_dead(
        &self,
        delivery: &WebhookDelivery,
        attempt: i32,
        response_code: Option<i32>,
        message: &str,
        latency_ms: Option<i32>,
    ) {
        tracing::warn!(
            target: "webhook_delivery",
            delivery_id = %delivery.id,
            endpoint_id = %delivery.endpoint_id,
            tenant_id = %delivery.tenant_id,
            event_id = %delivery.event_id,
            event_type = %delivery.event_type,
            error = %message,
            attempt_count = attempt,
            "Webhook delivery dead-lettered"
        );

        if let Err(e) = WebhookDelivery::mark_dead(
            &self.pool,
            delivery.id,
            attempt,
            response_code,
            &truncate_snippet(message),
            latency_ms,
        )
        .await
        {
            self.log_update_failure(delivery.id, &e);
        }
    }

    fn log_update_failure(&self, delivery_id: Uuid, e: &sqlx::Error) {
        tracing::error!(
            target: "webhook_delivery",
            delivery_id = %delivery_id,
            error = %e,
            "Failed to persist delivery outcome"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
