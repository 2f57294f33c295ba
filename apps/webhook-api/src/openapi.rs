//! OpenAPI document for the webhook subsystem API.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use tradewind_webhooks::error::ErrorResponse;
use tradewind_webhooks::handlers::{api_keys, deliveries, endpoints, events};
use tradewind_webhooks::models::{
    ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse, CreateEndpointRequest,
    CreateEndpointResponse, DeliveryListResponse, DeliveryResponse, EndpointResponse,
    EventResponse, PublishEventRequest, ReplayResponse, RotateSecretResponse,
    UpdateEndpointRequest,
};

/// Aggregated OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tradewind Webhook API",
        description = "Webhook fan-out, signed delivery, and API credential management",
    ),
    paths(
        api_keys::create_api_key_handler,
        api_keys::list_api_keys_handler,
        api_keys::revoke_api_key_handler,
        endpoints::create_endpoint_handler,
        endpoints::list_endpoints_handler,
        endpoints::get_endpoint_handler,
        endpoints::update_endpoint_handler,
        endpoints::rotate_secret_handler,
        endpoints::delete_endpoint_handler,
        events::publish_event_handler,
        deliveries::list_deliveries_handler,
        deliveries::get_delivery_handler,
        deliveries::replay_delivery_handler,
    ),
    components(schemas(
        ApiKeyResponse,
        CreateApiKeyRequest,
        CreateApiKeyResponse,
        CreateEndpointRequest,
        CreateEndpointResponse,
        DeliveryListResponse,
        DeliveryResponse,
        EndpointResponse,
        ErrorResponse,
        EventResponse,
        PublishEventRequest,
        ReplayResponse,
        RotateSecretResponse,
        UpdateEndpointRequest,
    )),
    tags(
        (name = "API Keys", description = "Tenant API credential management"),
        (name = "Endpoints", description = "Webhook endpoint registry"),
        (name = "Events", description = "Platform-internal event publication"),
        (name = "Deliveries", description = "Delivery history and replay"),
    )
)]
pub struct ApiDoc;

/// Route serving the OpenAPI JSON document.
pub fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
