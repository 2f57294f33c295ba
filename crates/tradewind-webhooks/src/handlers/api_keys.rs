//! Handlers for API credential management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiResult, WebhookError};
use crate::models::{ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse};
use crate::router::WebhooksState;
use crate::tenant::TenantContext;

/// Issue a new API key.
///
/// The plaintext key appears only in this response; afterwards only its
/// SHA-256 hash exists.
#[utoipa::path(
    post,
    path = "/api-keys",
    tag = "API Keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "Credential issued", body = CreateApiKeyResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn create_api_key_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let (credential, raw_key) = state.credentials.issue(ctx.tenant_id(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            credential: credential.into(),
            raw_key,
        }),
    ))
}

/// List API keys. No secret material is ever included.
#[utoipa::path(
    get,
    path = "/api-keys",
    tag = "API Keys",
    responses(
        (status = 200, description = "Credential list", body = [ApiKeyResponse]),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn list_api_keys_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<Vec<ApiKeyResponse>>> {
    let credentials = state.credentials.list(ctx.tenant_id()).await?;
    Ok(Json(credentials.into_iter().map(Into::into).collect()))
}

/// Revoke an API key. Idempotent: revoking twice is a no-op, not an error.
#[utoipa::path(
    post,
    path = "/api-keys/{id}/revoke",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "Credential ID")),
    responses(
        (status = 200, description = "Credential revoked", body = ApiKeyResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Credential not found"),
    ),
)]
pub async fn revoke_api_key_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiKeyResponse>> {
    let credential = state.credentials.revoke(ctx.tenant_id(), id).await?;
    Ok(Json(credential.into()))
}
