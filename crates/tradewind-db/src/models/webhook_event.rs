//! Webhook event model.
//!
//! The write-once record of a published domain event. The payload is an
//! opaque, already-validated JSON document; this subsystem never interprets
//! it. Event rows are the permanent source of truth and outlive all their
//! deliveries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A published domain event.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Data for recording a new event.
#[derive(Debug, Clone)]
pub struct CreateWebhookEvent {
    pub tenant_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl WebhookEvent {
    /// Insert a new event row. Takes any executor so the publisher can run it
    /// inside the fan-out transaction.
    pub async fn create<'e, E>(executor: E, input: CreateWebhookEvent) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO webhook_events (tenant_id, event_type, payload)
            VALUES ($1, $2, $3)
            RETURNING id, tenant_id, event_type, payload, created_at
            "#,
        )
        .bind(input.tenant_id)
        .bind(input.event_type)
        .bind(input.payload)
        .fetch_one(executor)
        .await
    }

    /// Fetch one event with tenant isolation.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, event_type, payload, created_at
            FROM webhook_events
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetch an event by id alone, for the delivery engine working from a
    /// claimed delivery row.
    pub async fn find_for_delivery(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, event_type, payload, created_at
            FROM webhook_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
