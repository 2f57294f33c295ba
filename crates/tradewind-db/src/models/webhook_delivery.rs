//! Webhook delivery model.
//!
//! One row per (event, endpoint) pair created at publish time. The row is the
//! single unit of concurrency control for the delivery engine: workers take
//! exclusive ownership of a due row via [`WebhookDelivery::claim_due`], which
//! combines `FOR UPDATE SKIP LOCKED` with a lease-style push of
//! `next_retry_at`, so a crashed worker's row becomes eligible again when the
//! lease lapses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery state machine:
/// `pending → delivered | failed | dead`, `failed → delivered | failed | dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Awaiting its first transmission.
    Pending,
    /// Terminal success: the receiver acknowledged with a 2xx.
    Delivered,
    /// Transient failure, scheduled for retry at `next_retry_at`.
    Failed,
    /// Terminal failure: retries exhausted or parents missing. Requires
    /// operator replay.
    Dead,
}

impl DeliveryStatus {
    /// Terminal states carry no retry schedule.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Dead)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Failed => write!(f, "failed"),
            DeliveryStatus::Dead => write!(f, "dead"),
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeliveryStatus::Pending),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            "dead" => Ok(DeliveryStatus::Dead),
            _ => Err(format!("Unknown delivery status: {s}")),
        }
    }
}

/// A single delivery attempt record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub endpoint_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub status: DeliveryStatus,
    pub attempt_count: i32,
    pub response_code: Option<i32>,
    pub response_snippet: Option<String>,
    pub latency_ms: Option<i32>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a delivery row at fan-out time.
#[derive(Debug, Clone)]
pub struct CreateWebhookDelivery {
    pub tenant_id: Uuid,
    pub endpoint_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
}

/// Filter for the tenant-facing delivery listing.
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub endpoint_id: Option<Uuid>,
    pub status: Option<DeliveryStatus>,
}

impl WebhookDelivery {
    /// Insert a `pending` delivery row with `next_retry_at = NOW()`. Takes any
    /// executor so the publisher can fan out inside one transaction.
    ///
    /// `ON CONFLICT DO NOTHING` on the `(event_id, endpoint_id)` unique key
    /// makes fan-out idempotent: a retried publish never double-creates a row.
    /// Returns `None` when the row already existed.
    pub async fn create<'e, E>(
        executor: E,
        input: CreateWebhookDelivery,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO webhook_deliveries (tenant_id, endpoint_id, event_id, event_type,
                                            status, next_retry_at)
            VALUES ($1, $2, $3, $4, 'pending', NOW())
            ON CONFLICT (event_id, endpoint_id) DO NOTHING
            RETURNING id, tenant_id, endpoint_id, event_id, event_type, status,
                      attempt_count, response_code, response_snippet, latency_ms,
                      next_retry_at, delivered_at, created_at, updated_at
            "#,
        )
        .bind(input.tenant_id)
        .bind(input.endpoint_id)
        .bind(input.event_id)
        .bind(input.event_type)
        .fetch_optional(executor)
        .await
    }

    /// Claim up to `batch` rows that are due to run.
    ///
    /// Eligibility: `status IN ('pending', 'failed') AND next_retry_at <= NOW()`.
    /// The claiming UPDATE pushes `next_retry_at` forward by `lease` inside the
    /// same statement, and `FOR UPDATE SKIP LOCKED` keeps concurrent claimers
    /// off the same rows. The combination guarantees no two workers process
    /// one delivery concurrently.
    pub async fn claim_due(
        pool: &PgPool,
        batch: i64,
        lease_seconds: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE webhook_deliveries
            SET next_retry_at = NOW() + make_interval(secs => $2), updated_at = NOW()
            WHERE id IN (
                SELECT id
                FROM webhook_deliveries
                WHERE status IN ('pending', 'failed') AND next_retry_at <= NOW()
                ORDER BY next_retry_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, tenant_id, endpoint_id, event_id, event_type, status,
                      attempt_count, response_code, response_snippet, latency_ms,
                      next_retry_at, delivered_at, created_at, updated_at
            "#,
        )
        .bind(batch)
        .bind(lease_seconds as f64)
        .fetch_all(pool)
        .await
    }

    /// Record a successful transmission: terminal `delivered`, schedule cleared.
    pub async fn mark_delivered(
        pool: &PgPool,
        id: Uuid,
        attempt_count: i32,
        response_code: i32,
        latency_ms: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET status = 'delivered', attempt_count = $2, response_code = $3,
                latency_ms = $4, next_retry_at = NULL, delivered_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .bind(response_code)
        .bind(latency_ms)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Record a transient failure and its retry schedule.
    pub async fn mark_failed(
        pool: &PgPool,
        id: Uuid,
        attempt_count: i32,
        response_code: Option<i32>,
        response_snippet: &str,
        latency_ms: Option<i32>,
        next_retry_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET status = 'failed', attempt_count = $2, response_code = $3,
                response_snippet = $4, latency_ms = $5, next_retry_at = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .bind(response_code)
        .bind(response_snippet)
        .bind(latency_ms)
        .bind(next_retry_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Dead-letter a delivery: terminal `dead`, schedule cleared.
    pub async fn mark_dead(
        pool: &PgPool,
        id: Uuid,
        attempt_count: i32,
        response_code: Option<i32>,
        response_snippet: &str,
        latency_ms: Option<i32>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET status = 'dead', attempt_count = $2, response_code = $3,
                response_snippet = $4, latency_ms = $5, next_retry_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .bind(response_code)
        .bind(response_snippet)
        .bind(latency_ms)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Fetch one delivery with tenant isolation.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, endpoint_id, event_id, event_type, status,
                   attempt_count, response_code, response_snippet, latency_ms,
                   next_retry_at, delivered_at, created_at, updated_at
            FROM webhook_deliveries
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List deliveries for a tenant, newest first, optionally filtered by
    /// endpoint and status.
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        filter: &DeliveryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, endpoint_id, event_id, event_type, status,
                   attempt_count, response_code, response_snippet, latency_ms,
                   next_retry_at, delivered_at, created_at, updated_at
            FROM webhook_deliveries
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR endpoint_id = $2)
              AND ($3::varchar IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(filter.endpoint_id)
        .bind(filter.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Count deliveries matching the listing filter.
    pub async fn count_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        filter: &DeliveryFilter,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM webhook_deliveries
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR endpoint_id = $2)
              AND ($3::varchar IS NULL OR status = $3)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.endpoint_id)
        .bind(filter.status)
        .fetch_one(pool)
        .await
    }

    /// Reset a delivery for replay, whatever its current status: attempt count
    /// back to 1, status `pending`. The row is simultaneously claimed (its
    /// `next_retry_at` is pushed out by `lease`) so a polling worker cannot
    /// race the synchronous replay attempt. No new row is ever created.
    ///
    /// Returns `None` if the delivery does not exist for this tenant.
    pub async fn reset_for_replay(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        lease_seconds: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE webhook_deliveries
            SET status = 'pending', attempt_count = 1,
                next_retry_at = NOW() + make_interval(secs => $3),
                delivered_at = NULL, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, endpoint_id, event_id, event_type, status,
                      attempt_count, response_code, response_snippet, latency_ms,
                      next_retry_at, delivered_at, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(lease_seconds as f64)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip() {
        for (status, s) in [
            (DeliveryStatus::Pending, "pending"),
            (DeliveryStatus::Delivered, "delivered"),
            (DeliveryStatus::Failed, "failed"),
            (DeliveryStatus::Dead, "dead"),
        ] {
            assert_eq!(status.to_string(), s);
            assert_eq!(DeliveryStatus::from_str(s).unwrap(), status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Dead.is_terminal());
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::Failed.is_terminal());
    }
}
