//! API credential model.
//!
//! Stores tenant-scoped API credentials as a one-way SHA-256 hash plus a
//! loggable key prefix. Rows are never deleted; revocation is the only
//! lifecycle transition and it is one-way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an API credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Credential is usable by the inbound authorization layer.
    Active,
    /// Credential has been revoked. There is no un-revoke.
    Revoked,
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialStatus::Active => write!(f, "active"),
            CredentialStatus::Revoked => write!(f, "revoked"),
        }
    }
}

impl std::str::FromStr for CredentialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(CredentialStatus::Active),
            "revoked" => Ok(CredentialStatus::Revoked),
            _ => Err(format!("Unknown credential status: {s}")),
        }
    }
}

/// A stored API credential. `key_hash` never leaves the persistence layer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiCredential {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Data for creating a new API credential.
#[derive(Debug, Clone)]
pub struct CreateApiCredential {
    pub tenant_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
}

impl ApiCredential {
    /// Insert a new credential row.
    pub async fn create(pool: &PgPool, input: CreateApiCredential) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO api_credentials (tenant_id, name, key_prefix, key_hash, scopes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, tenant_id, name, key_prefix, key_hash, scopes, status,
                      created_at, revoked_at
            "#,
        )
        .bind(input.tenant_id)
        .bind(input.name)
        .bind(input.key_prefix)
        .bind(input.key_hash)
        .bind(input.scopes)
        .fetch_one(pool)
        .await
    }

    /// List all credentials for a tenant, newest first.
    pub async fn list_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, name, key_prefix, key_hash, scopes, status,
                   created_at, revoked_at
            FROM api_credentials
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Fetch one credential with tenant isolation.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, tenant_id, name, key_prefix, key_hash, scopes, status,
                   created_at, revoked_at
            FROM api_credentials
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Revoke a credential. The conditional `status = 'active'` guard makes the
    /// operation idempotent: a second revoke matches no row and the caller
    /// falls back to the already-revoked record, `revoked_at` untouched.
    ///
    /// Returns `None` if the credential does not exist for this tenant.
    pub async fn revoke(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let revoked = sqlx::query_as::<_, Self>(
            r#"
            UPDATE api_credentials
            SET status = 'revoked', revoked_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = 'active'
            RETURNING id, tenant_id, name, key_prefix, key_hash, scopes, status,
                      created_at, revoked_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match revoked {
            Some(row) => Ok(Some(row)),
            None => Self::find_by_id(pool, tenant_id, id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip() {
        for (status, s) in [
            (CredentialStatus::Active, "active"),
            (CredentialStatus::Revoked, "revoked"),
        ] {
            assert_eq!(status.to_string(), s);
            assert_eq!(CredentialStatus::from_str(s).unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert!(CredentialStatus::from_str("expired").is_err());
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(
            CredentialStatus::from_str("REVOKED").unwrap(),
            CredentialStatus::Revoked
        );
    }
}
