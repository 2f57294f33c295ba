//! Webhook endpoint registry.
//!
//! Create, list, mutate, and delete tenant delivery destinations. Signing
//! secrets are generated here, encrypted at rest, and returned in plaintext
//! exactly once — on creation and on rotation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::crypto;
use crate::error::WebhookError;
use crate::models::{CreateEndpointRequest, UpdateEndpointRequest};
use crate::validation;
use tradewind_db::models::{CreateWebhookEndpoint, EndpointStatus, WebhookEndpoint};

/// Default maximum non-disabled endpoints per tenant.
pub const DEFAULT_MAX_ENDPOINTS: i64 = 25;

/// Service for endpoint registry operations.
#[derive(Clone)]
pub struct EndpointService {
    pool: PgPool,
    encryption_key: Vec<u8>,
    max_endpoints: i64,
    allow_http: bool,
}

impl EndpointService {
    /// Create a new endpoint service.
    #[must_use]
    pub fn new(pool: PgPool, encryption_key: Vec<u8>) -> Self {
        Self {
            pool,
            encryption_key,
            max_endpoints: DEFAULT_MAX_ENDPOINTS,
            allow_http: false,
        }
    }

    /// Set the per-tenant endpoint cap.
    #[must_use]
    pub fn with_max_endpoints(mut self, max: i64) -> Self {
        self.max_endpoints = max;
        self
    }

    /// Allow plain-HTTP destination URLs (dev/test only).
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Register a new endpoint. Returns the record and the plaintext signing
    /// secret, which is never shown again.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        request: CreateEndpointRequest,
    ) -> Result<(WebhookEndpoint, String), WebhookError> {
        validation::validate_endpoint_url(&request.url, self.allow_http)?;
        validation::validate_event_types(&request.event_types)?;

        let count = WebhookEndpoint::count_by_tenant(&self.pool, tenant_id).await?;
        if count >= self.max_endpoints {
            return Err(WebhookError::EndpointLimitExceeded {
                limit: self.max_endpoints,
            });
        }

        let secret = crypto::generate_secret();
        let secret_encrypted = crypto::encrypt_secret(&secret, &self.encryption_key)?;

        let endpoint = WebhookEndpoint::create(
            &self.pool,
            CreateWebhookEndpoint {
                tenant_id,
                url: request.url,
                secret_encrypted,
                event_types: request.event_types,
            },
        )
        .await?;

        tracing::info!(
            target: "webhook_endpoints",
            endpoint_id = %endpoint.id,
            tenant_id = %tenant_id,
            url = %endpoint.url,
            "Registered webhook endpoint"
        );

        Ok((endpoint, secret))
    }

    /// List a tenant's endpoints, newest first.
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<WebhookEndpoint>, WebhookError> {
        Ok(WebhookEndpoint::list_by_tenant(&self.pool, tenant_id).await?)
    }

    /// Fetch one endpoint.
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<WebhookEndpoint, WebhookError> {
        WebhookEndpoint::find_by_id(&self.pool, tenant_id, id)
            .await?
            .ok_or(WebhookError::EndpointNotFound)
    }

    /// Apply an in-place update: replace subscriptions and/or change status.
    ///
    /// Disabling only stops future fan-out; deliveries already created keep
    /// their retry schedule.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        request: UpdateEndpointRequest,
    ) -> Result<WebhookEndpoint, WebhookError> {
        if let Some(ref event_types) = request.event_types {
            validation::validate_event_types(event_types)?;
        }

        let mut endpoint = self.get(tenant_id, id).await?;

        if let Some(event_types) = request.event_types {
            endpoint = WebhookEndpoint::update_event_types(&self.pool, tenant_id, id, event_types)
                .await?
                .ok_or(WebhookError::EndpointNotFound)?;
        }

        if let Some(status) = request.status {
            endpoint = WebhookEndpoint::set_status(&self.pool, tenant_id, id, status)
                .await?
                .ok_or(WebhookError::EndpointNotFound)?;

            tracing::info!(
                target: "webhook_endpoints",
                endpoint_id = %id,
                tenant_id = %tenant_id,
                status = %status,
                "Endpoint status changed"
            );
        }

        Ok(endpoint)
    }

    /// Rotate the signing secret. The new plaintext is returned exactly once.
    ///
    /// Deliveries whose signature was computed under the prior secret are
    /// unaffected; only future signing reads the rotated value.
    pub async fn rotate_secret(&self, tenant_id: Uuid, id: Uuid) -> Result<String, WebhookError> {
        let secret = crypto::generate_secret();
        let secret_encrypted = crypto::encrypt_secret(&secret, &self.encryption_key)?;

        WebhookEndpoint::update_secret(&self.pool, tenant_id, id, secret_encrypted)
            .await?
            .ok_or(WebhookError::EndpointNotFound)?;

        tracing::info!(
            target: "webhook_endpoints",
            endpoint_id = %id,
            tenant_id = %tenant_id,
            "Rotated endpoint signing secret"
        );

        Ok(secret)
    }

    /// Change the endpoint status.
    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: EndpointStatus,
    ) -> Result<WebhookEndpoint, WebhookError> {
        WebhookEndpoint::set_status(&self.pool, tenant_id, id, status)
            .await?
            .ok_or(WebhookError::EndpointNotFound)
    }

    /// Delete an endpoint. Historical deliveries survive and will be
    /// dead-lettered by the engine if still pending.
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), WebhookError> {
        let deleted = WebhookEndpoint::delete(&self.pool, tenant_id, id).await?;
        if !deleted {
            return Err(WebhookError::EndpointNotFound);
        }
        Ok(())
    }
}
