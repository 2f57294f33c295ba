//! Handlers for delivery history and replay.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{ApiResult, WebhookError};
use crate::models::{DeliveryListResponse, DeliveryResponse, ListDeliveriesQuery, ReplayResponse};
use crate::router::WebhooksState;
use crate::tenant::TenantContext;
use tradewind_db::models::{DeliveryFilter, DeliveryStatus, WebhookDelivery};

/// List delivery attempts, most recent first.
///
/// `dead` rows surfacing here are the operator's cue to fix the endpoint and
/// replay.
#[utoipa::path(
    get,
    path = "/deliveries",
    tag = "Deliveries",
    params(ListDeliveriesQuery),
    responses(
        (status = 200, description = "Paginated delivery list", body = DeliveryListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn list_deliveries_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<ListDeliveriesQuery>,
) -> ApiResult<Json<DeliveryListResponse>> {
    let status = query
        .status
        .as_deref()
        .map(DeliveryStatus::from_str)
        .transpose()
        .map_err(WebhookError::Validation)?;

    let filter = DeliveryFilter {
        endpoint_id: query.endpoint_id,
        status,
    };

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let deliveries =
        WebhookDelivery::list_by_tenant(state.pool(), ctx.tenant_id(), &filter, limit, offset)
            .await?;
    let total = WebhookDelivery::count_by_tenant(state.pool(), ctx.tenant_id(), &filter).await?;

    Ok(Json(DeliveryListResponse {
        items: deliveries.into_iter().map(Into::into).collect(),
        total,
        limit,
        offset,
    }))
}

/// Get one delivery attempt in full detail.
#[utoipa::path(
    get,
    path = "/deliveries/{id}",
    tag = "Deliveries",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery details", body = DeliveryResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Delivery not found"),
    ),
)]
pub async fn get_delivery_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeliveryResponse>> {
    let delivery = WebhookDelivery::find_by_id(state.pool(), ctx.tenant_id(), id)
        .await?
        .ok_or(WebhookError::DeliveryNotFound)?;

    Ok(Json(delivery.into()))
}

/// Replay a delivery immediately, outside its backoff schedule.
#[utoipa::path(
    post,
    path = "/deliveries/{id}/replay",
    tag = "Deliveries",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Replay executed", body = ReplayResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Delivery not found"),
    ),
)]
pub async fn replay_delivery_handler(
    State(state): State<WebhooksState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReplayResponse>> {
    state.replay.replay(ctx.tenant_id(), id).await?;
    Ok(Json(ReplayResponse { success: true }))
}
