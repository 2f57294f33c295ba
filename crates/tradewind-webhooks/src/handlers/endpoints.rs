//! Handlers for webhook endpoint management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiResult, WebhookError};
use crate::models::{
    CreateEndpointRequest, CreateEndpointResponse, EndpointResponse, RotateSecretResponse,
    UpdateEndpointRequest,
};
use crate::router::WebhooksState;
use crate::tenant::TenantContext;

/// Register a new webhook endpoint.
///
/// The signing secret appears only in this response; at rest it exists only
/// as AES-256-GCM ciphertext.
#[utoipa::path(
    post,
    path = "/endpoints",
    tag = "Endpoints",
    request_body = CreateEndpointRequest,
    responses(
        (status = 201, description = "Endpoint registered", body = CreateEndpointResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing tenant context"),
        (status = 409, description = "Endpoint limit exceeded"),
    ),
)]
pub async fn create_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Json(request): Json<CreateEndpointRequest>,
) -> ApiResult<(StatusCode, Json<CreateEndpointResponse>)> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let (endpoint, secret) = state.endpoints.create(ctx.tenant_id(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEndpointResponse {
            endpoint: endpoint.into(),
            secret,
        }),
    ))
}

/// List webhook endpoints.
#[utoipa::path(
    get,
    path = "/endpoints",
    tag = "Endpoints",
    responses(
        (status = 200, description = "Endpoint list", body = [EndpointResponse]),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn list_endpoints_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<Vec<EndpointResponse>>> {
    let endpoints = state.endpoints.list(ctx.tenant_id()).await?;
    Ok(Json(endpoints.into_iter().map(Into::into).collect()))
}

/// Get a single webhook endpoint.
#[utoipa::path(
    get,
    path = "/endpoints/{id}",
    tag = "Endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Endpoint details", body = EndpointResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Endpoint not found"),
    ),
)]
pub async fn get_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EndpointResponse>> {
    let endpoint = state.endpoints.get(ctx.tenant_id(), id).await?;
    Ok(Json(endpoint.into()))
}

/// Update an endpoint in place: subscriptions and/or status.
#[utoipa::path(
    patch,
    path = "/endpoints/{id}",
    tag = "Endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    request_body = UpdateEndpointRequest,
    responses(
        (status = 200, description = "Endpoint updated", body = EndpointResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Endpoint not found"),
    ),
)]
pub async fn update_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEndpointRequest>,
) -> ApiResult<Json<EndpointResponse>> {
    let endpoint = state.endpoints.update(ctx.tenant_id(), id, request).await?;
    Ok(Json(endpoint.into()))
}

/// Rotate an endpoint's signing secret.
///
/// Deliveries already signed with the prior secret are unaffected; only
/// future signing uses the new value.
#[utoipa::path(
    post,
    path = "/endpoints/{id}/rotate-secret",
    tag = "Endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "New secret (shown once)", body = RotateSecretResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Endpoint not found"),
    ),
)]
pub async fn rotate_secret_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RotateSecretResponse>> {
    let secret = state.endpoints.rotate_secret(ctx.tenant_id(), id).await?;
    Ok(Json(RotateSecretResponse { secret }))
}

/// Delete a webhook endpoint. Historical deliveries survive.
#[utoipa::path(
    delete,
    path = "/endpoints/{id}",
    tag = "Endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 204, description = "Endpoint deleted"),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Endpoint not found"),
    ),
)]
pub async fn delete_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.endpoints.delete(ctx.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
