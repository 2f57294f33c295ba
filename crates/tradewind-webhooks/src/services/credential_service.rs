//! API credential issuance, listing, and revocation.
//!
//! Credentials authenticate *inbound* platform API calls; the verification
//! itself happens in a separate authorization layer that reads these records.
//! Only a one-way hash is stored — the plaintext key exists exactly once, in
//! the issuance response.

use sqlx::PgPool;
use uuid::Uuid;

use crate::crypto;
use crate::error::WebhookError;
use crate::models::CreateApiKeyRequest;
use crate::validation;
use tradewind_db::models::{ApiCredential, CreateApiCredential};

/// Prefix identifying platform API keys in logs and support tickets without
/// exposing key material.
pub const API_KEY_PREFIX: &str = "tw_live_";

/// Service for API credential operations.
#[derive(Clone)]
pub struct CredentialService {
    pool: PgPool,
}

impl CredentialService {
    /// Create a new credential service.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a new API credential.
    ///
    /// Returns the stored record and the plaintext key. The plaintext is
    /// never persisted and cannot be retrieved again.
    pub async fn issue(
        &self,
        tenant_id: Uuid,
        request: CreateApiKeyRequest,
    ) -> Result<(ApiCredential, String), WebhookError> {
        if request.name.trim().is_empty() {
            return Err(WebhookError::Validation(
                "Credential name cannot be empty".to_string(),
            ));
        }
        validation::validate_scopes(&request.scopes)?;

        let plaintext = format!("{API_KEY_PREFIX}{}", crypto::generate_secret());
        let key_hash = crypto::hash_api_key(&plaintext);

        let credential = ApiCredential::create(
            &self.pool,
            CreateApiCredential {
                tenant_id,
                name: request.name,
                key_prefix: API_KEY_PREFIX.to_string(),
                key_hash,
                scopes: request.scopes,
            },
        )
        .await?;

        tracing::info!(
            target: "api_credentials",
            credential_id = %credential.id,
            tenant_id = %tenant_id,
            "Issued API credential"
        );

        Ok((credential, plaintext))
    }

    /// List a tenant's credentials, newest first. Hashes stay internal; the
    /// handler layer maps rows to hash-free responses.
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<ApiCredential>, WebhookError> {
        Ok(ApiCredential::list_by_tenant(&self.pool, tenant_id).await?)
    }

    /// Revoke a credential. Idempotent: revoking an already-revoked
    /// credential returns it unchanged, `revoked_at` keeping its first value.
    pub async fn revoke(
        &self,
        tenant_id: Uuid,
        credential_id: Uuid,
    ) -> Result<ApiCredential, WebhookError> {
        let credential = ApiCredential::revoke(&self.pool, tenant_id, credential_id)
            .await?
            .ok_or(WebhookError::CredentialNotFound)?;

        tracing::info!(
            target: "api_credentials",
            credential_id = %credential.id,
            tenant_id = %tenant_id,
            "Revoked API credential"
        );

        Ok(credential)
    }
}
