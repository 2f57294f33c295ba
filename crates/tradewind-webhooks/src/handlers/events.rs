//! Handler for platform-internal event publication.

use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::error::ApiResult;
use crate::models::{EventResponse, PublishEventRequest};
use crate::router::WebhooksState;
use crate::tenant::TenantContext;

/// Publish a domain event.
///
/// Returns as soon as the event and its fan-out rows are committed; delivery
/// happens asynchronously and its failures never surface here. Zero matching
/// endpoints still records the event.
#[utoipa::path(
    post,
    path = "/events",
    tag = "Events",
    request_body = PublishEventRequest,
    responses(
        (status = 201, description = "Event recorded and fanned out", body = EventResponse),
        (status = 400, description = "Unknown event type"),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn publish_event_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Json(request): Json<PublishEventRequest>,
) -> ApiResult<(StatusCode, Json<EventResponse>)> {
    let event = state
        .publisher
        .publish(ctx.tenant_id(), &request.event_type, request.payload)
        .await?;

    Ok((StatusCode::CREATED, Json(event.into())))
}
