//! Axum router and shared state for the webhook subsystem.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::handlers::{api_keys, deliveries, endpoints, events};
use crate::services::credential_service::CredentialService;
use crate::services::delivery_service::DeliveryService;
use crate::services::endpoint_service::EndpointService;
use crate::services::event_publisher::EventPublisher;
use crate::services::replay_service::ReplayService;
use crate::tenant::tenant_context_middleware;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhooksState {
    pub credentials: CredentialService,
    pub endpoints: EndpointService,
    pub publisher: EventPublisher,
    pub replay: ReplayService,
    pool: PgPool,
}

impl WebhooksState {
    /// Wire up all services over one pool.
    ///
    /// `publisher` and `delivery_service` are passed in because the binary
    /// shares them with the delivery worker.
    #[must_use]
    pub fn new(
        pool: PgPool,
        encryption_key: Vec<u8>,
        publisher: EventPublisher,
        delivery_service: DeliveryService,
    ) -> Self {
        Self {
            credentials: CredentialService::new(pool.clone()),
            endpoints: EndpointService::new(pool.clone(), encryption_key),
            publisher,
            replay: ReplayService::new(pool.clone(), delivery_service),
            pool,
        }
    }

    /// Allow plain-HTTP endpoint URLs (dev/test only).
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.endpoints = self.endpoints.with_allow_http(allow);
        self
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Build the webhook subsystem router. Every route is tenant-scoped via the
/// tenant-context middleware.
pub fn webhooks_router(state: WebhooksState) -> Router {
    Router::new()
        // API credentials
        .route(
            "/api-keys",
            post(api_keys::create_api_key_handler).get(api_keys::list_api_keys_handler),
        )
        .route(
            "/api-keys/{id}/revoke",
            post(api_keys::revoke_api_key_handler),
        )
        // Endpoint registry
        .route(
            "/endpoints",
            post(endpoints::create_endpoint_handler).get(endpoints::list_endpoints_handler),
        )
        .route(
            "/endpoints/{id}",
            get(endpoints::get_endpoint_handler)
                .patch(endpoints::update_endpoint_handler)
                .delete(endpoints::delete_endpoint_handler),
        )
        .route(
            "/endpoints/{id}/rotate-secret",
            post(endpoints::rotate_secret_handler),
        )
        // Event publication (platform-internal)
        .route("/events", post(events::publish_event_handler))
        // Delivery history & replay
        .route("/deliveries", get(deliveries::list_deliveries_handler))
        .route("/deliveries/{id}", get(deliveries::get_delivery_handler))
        .route(
            "/deliveries/{id}/replay",
            post(deliveries::replay_delivery_handler),
        )
        .layer(middleware::from_fn(tenant_context_middleware))
        .with_state(state)
}
