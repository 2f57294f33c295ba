//! Tenant context extraction.
//!
//! Inbound authentication is the platform gateway's job; by the time a
//! request reaches this subsystem the gateway has resolved the tenant and
//! forwarded it as the `X-Tenant-Id` header. The middleware here turns that
//! header into a [`TenantContext`] request extension; every handler is
//! tenant-scoped through it.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::WebhookError;

/// Header carrying the gateway-resolved tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// The tenant a request acts on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    tenant_id: Uuid,
}

impl TenantContext {
    /// Create a new tenant context.
    #[must_use]
    pub fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id }
    }

    /// Get the tenant id.
    #[must_use]
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

/// Middleware extracting [`TenantContext`] from the tenant header.
///
/// Requests without a valid UUID tenant header are rejected before any
/// handler runs.
pub async fn tenant_context_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, WebhookError> {
    let tenant_id = request
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(WebhookError::TenantMissing)?;

    request
        .extensions_mut()
        .insert(TenantContext::new(tenant_id));

    Ok(next.run(request).await)
}
