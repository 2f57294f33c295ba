//! Webhook endpoint model.
//!
//! A tenant-owned delivery destination: URL, encrypted signing secret, and the
//! set of subscribed event types. Only `active` endpoints receive fan-out;
//! pausing or disabling an endpoint never touches deliveries already created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a webhook endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    /// Receives fan-out for subscribed event types.
    Active,
    /// Temporarily excluded from fan-out (operator action, reversible).
    Paused,
    /// Excluded from fan-out; typically the terminal state for abandoned
    /// destinations.
    Disabled,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointStatus::Active => write!(f, "active"),
            EndpointStatus::Paused => write!(f, "paused"),
            EndpointStatus::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for EndpointStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(EndpointStatus::Active),
            "paused" => Ok(EndpointStatus::Paused),
            "disabled" => Ok(EndpointStatus::Disabled),
            _ => Err(format!("Unknown endpoint status: {s}")),
        }
    }
}

/// A stored webhook endpoint. `secret_encrypted` is AES-256-GCM ciphertext;
/// only the delivery engine holds the key to decrypt it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub url: String,
    pub secret_encrypted: String,
    pub event_types: Vec<String>,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new webhook endpoint.
#[derive(Debug, Clone)]
pub struct CreateWebhookEndpoint {
    pub tenant_id: Uuid,
    pub url: String,
    pub secret_encrypted: String,
    pub event_types: Vec<String>,
}

impl WebhookEndpoint {
    /// Insert a new endpoint row.
    pub async fn create(pool: &PgPool, input: CreateWebhookEndpoint) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO webhook_endpoints (tenant_id, url, secret_encrypted, event_types)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tenant_id, url, secret_encrypted, event_types, status,
                      created_at, updated_at
            "#,
        )
        .bind(input.tenant_id)
        .bind(input.url)
        .bind(input.secret_encrypted)
        .bind(input.event_types)
        .fetch_one(pool)
        .await
    }

    /// List all endpoints for a tenant, newest first.
    pub async fn list_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, url, secret_encrypted, event_types, status,
                   created_at, updated_at
            FROM webhook_endpoints
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Fetch one endpoint with tenant isolation.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, url, secret_encrypted, event_types, status,
                   created_at, updated_at
            FROM webhook_endpoints
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetch an endpoint by id alone. Used by the delivery engine, which works
    /// from a claimed delivery row and must still find parents whose tenant
    /// scoping it already trusts.
    pub async fn find_for_delivery(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, url, secret_encrypted, event_types, status,
                   created_at, updated_at
            FROM webhook_endpoints
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Active endpoints of a tenant subscribed to the given event type.
    /// This is the fan-out query; paused and disabled endpoints never match.
    /// Takes any executor so the publisher can run it inside the fan-out
    /// transaction.
    pub async fn find_active_subscribed<'e, E>(
        executor: E,
        tenant_id: Uuid,
        event_type: &str,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, url, secret_encrypted, event_types, status,
                   created_at, updated_at
            FROM webhook_endpoints
            WHERE tenant_id = $1 AND status = 'active' AND $2 = ANY(event_types)
            "#,
        )
        .bind(tenant_id)
        .bind(event_type)
        .fetch_all(executor)
        .await
    }

    /// Count non-disabled endpoints for a tenant (per-tenant cap enforcement).
    pub async fn count_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM webhook_endpoints
            WHERE tenant_id = $1 AND status <> 'disabled'
            "#,
        )
        .bind(tenant_id)
        .fetch_one(pool)
        .await
    }

    /// Replace the subscribed event types.
    pub async fn update_event_types(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        event_types: Vec<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE webhook_endpoints
            SET event_types = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, url, secret_encrypted, event_types, status,
                      created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(event_types)
        .fetch_optional(pool)
        .await
    }

    /// Store a freshly encrypted signing secret. Attempts already signed with
    /// the prior secret are unaffected; only future signing reads this value.
    pub async fn update_secret(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        secret_encrypted: String,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE webhook_endpoints
            SET secret_encrypted = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, url, secret_encrypted, event_types, status,
                      created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(secret_encrypted)
        .fetch_optional(pool)
        .await
    }

    /// Change the endpoint status.
    pub async fn set_status(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        status: EndpointStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE webhook_endpoints
            SET status = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, url, secret_encrypted, event_types, status,
                      created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Delete an endpoint. Historical deliveries are intentionally left in
    /// place (no foreign key); the delivery engine dead-letters any still
    /// pending against a deleted endpoint.
    pub async fn delete(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM webhook_endpoints
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip() {
        for (status, s) in [
            (EndpointStatus::Active, "active"),
            (EndpointStatus::Paused, "paused"),
            (EndpointStatus::Disabled, "disabled"),
        ] {
            assert_eq!(status.to_string(), s);
            assert_eq!(EndpointStatus::from_str(s).unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert!(EndpointStatus::from_str("archived").is_err());
    }
}
