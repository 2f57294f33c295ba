//! API models and the commerce event-type catalogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use tradewind_db::models::{
    ApiCredential, CredentialStatus, DeliveryStatus, EndpointStatus, WebhookDelivery,
    WebhookEndpoint, WebhookEvent,
};

/// Scopes grantable to API credentials.
pub const VALID_SCOPES: &[&str] = &[
    "orders:read",
    "orders:write",
    "products:read",
    "products:write",
    "customers:read",
    "customers:write",
    "payments:read",
    "shipments:read",
    "shipments:write",
    "webhooks:manage",
];

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Domain events the platform publishes to webhook subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommerceEventType {
    OrderCreated,
    OrderUpdated,
    OrderCancelled,
    PaymentCaptured,
    PaymentFailed,
    PaymentRefunded,
    ShipmentDispatched,
    ShipmentDelivered,
    CustomerCreated,
    ProductUpdated,
}

impl CommerceEventType {
    /// Wire name of the event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommerceEventType::OrderCreated => "order.created",
            CommerceEventType::OrderUpdated => "order.updated",
            CommerceEventType::OrderCancelled => "order.cancelled",
            CommerceEventType::PaymentCaptured => "payment.captured",
            CommerceEventType::PaymentFailed => "payment.failed",
            CommerceEventType::PaymentRefunded => "payment.refunded",
            CommerceEventType::ShipmentDispatched => "shipment.dispatched",
            CommerceEventType::ShipmentDelivered => "shipment.delivered",
            CommerceEventType::CustomerCreated => "customer.created",
            CommerceEventType::ProductUpdated => "product.updated",
        }
    }

    /// Parse a wire name. Returns `None` for unknown types.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order.created" => Some(CommerceEventType::OrderCreated),
            "order.updated" => Some(CommerceEventType::OrderUpdated),
            "order.cancelled" => Some(CommerceEventType::OrderCancelled),
            "payment.captured" => Some(CommerceEventType::PaymentCaptured),
            "payment.failed" => Some(CommerceEventType::PaymentFailed),
            "payment.refunded" => Some(CommerceEventType::PaymentRefunded),
            "shipment.dispatched" => Some(CommerceEventType::ShipmentDispatched),
            "shipment.delivered" => Some(CommerceEventType::ShipmentDelivered),
            "customer.created" => Some(CommerceEventType::CustomerCreated),
            "product.updated" => Some(CommerceEventType::ProductUpdated),
            _ => None,
        }
    }

    /// Category prefix (`order`, `payment`, ...).
    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            CommerceEventType::OrderCreated
            | CommerceEventType::OrderUpdated
            | CommerceEventType::OrderCancelled => "order",
            CommerceEventType::PaymentCaptured
            | CommerceEventType::PaymentFailed
            | CommerceEventType::PaymentRefunded => "payment",
            CommerceEventType::ShipmentDispatched | CommerceEventType::ShipmentDelivered => {
                "shipment"
            }
            CommerceEventType::CustomerCreated => "customer",
            CommerceEventType::ProductUpdated => "product",
        }
    }

    /// All known event types.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![
            CommerceEventType::OrderCreated,
            CommerceEventType::OrderUpdated,
            CommerceEventType::OrderCancelled,
            CommerceEventType::PaymentCaptured,
            CommerceEventType::PaymentFailed,
            CommerceEventType::PaymentRefunded,
            CommerceEventType::ShipmentDispatched,
            CommerceEventType::ShipmentDelivered,
            CommerceEventType::CustomerCreated,
            CommerceEventType::ProductUpdated,
        ]
    }
}

// ---------------------------------------------------------------------------
// API credential DTOs
// ---------------------------------------------------------------------------

/// Request to issue a new API key.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateApiKeyRequest {
    /// Human-readable name (1-100 characters).
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    #[schema(example = "fulfillment-integration")]
    pub name: String,

    /// Granted scopes. Must be non-empty and drawn from the platform scope
    /// list.
    #[schema(example = json!(["orders:read", "webhooks:manage"]))]
    pub scopes: Vec<String>,
}

/// An API credential as returned by the listing (no secret material).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<ApiCredential> for ApiKeyResponse {
    fn from(c: ApiCredential) -> Self {
        Self {
            id: c.id,
            name: c.name,
            key_prefix: c.key_prefix,
            scopes: c.scopes,
            status: c.status,
            created_at: c.created_at,
            revoked_at: c.revoked_at,
        }
    }
}

/// Issuance response. `raw_key` is present here and nowhere else, ever.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateApiKeyResponse {
    #[serde(flatten)]
    pub credential: ApiKeyResponse,
    pub raw_key: String,
}

// ---------------------------------------------------------------------------
// Endpoint DTOs
// ---------------------------------------------------------------------------

/// Request to register a webhook endpoint.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEndpointRequest {
    /// Absolute HTTP(S) destination URL.
    #[schema(example = "https://hooks.example.com/tradewind")]
    pub url: String,

    /// Subscribed event types. Must be non-empty and known.
    #[validate(length(min = 1, message = "at least one event type is required"))]
    #[schema(example = json!(["order.created", "payment.captured"]))]
    pub event_types: Vec<String>,
}

/// Request to mutate an endpoint in place.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateEndpointRequest {
    /// Replacement for the subscribed event-type set.
    #[serde(default)]
    pub event_types: Option<Vec<String>>,

    /// New status (`active`, `paused`, `disabled`).
    #[serde(default)]
    pub status: Option<EndpointStatus>,
}

/// An endpoint as returned by the API (never the stored secret).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EndpointResponse {
    pub id: Uuid,
    pub url: String,
    pub event_types: Vec<String>,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookEndpoint> for EndpointResponse {
    fn from(e: WebhookEndpoint) -> Self {
        Self {
            id: e.id,
            url: e.url,
            event_types: e.event_types,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Registration response. `secret` is the signing secret, shown exactly once.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateEndpointResponse {
    #[serde(flatten)]
    pub endpoint: EndpointResponse,
    pub secret: String,
}

/// Secret rotation response; the new secret is shown exactly once.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RotateSecretResponse {
    pub secret: String,
}

// ---------------------------------------------------------------------------
// Event publication DTOs
// ---------------------------------------------------------------------------

/// Platform-internal request to publish a domain event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PublishEventRequest {
    #[schema(example = "order.created")]
    pub event_type: String,

    /// Opaque, already-validated event document. This subsystem never
    /// interprets it.
    pub payload: serde_json::Value,
}

/// A recorded event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<WebhookEvent> for EventResponse {
    fn from(e: WebhookEvent) -> Self {
        Self {
            id: e.id,
            event_type: e.event_type,
            payload: e.payload,
            created_at: e.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery DTOs
// ---------------------------------------------------------------------------

fn default_limit() -> i64 {
    50
}

/// Query parameters for the delivery listing.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListDeliveriesQuery {
    /// Restrict to one endpoint.
    #[serde(default)]
    pub endpoint_id: Option<Uuid>,

    /// Restrict to one status (`pending`, `delivered`, `failed`, `dead`).
    #[serde(default)]
    pub status: Option<String>,

    /// Page size (clamped to 1-100).
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Page offset.
    #[serde(default)]
    pub offset: i64,
}

/// A delivery attempt as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub status: DeliveryStatus,
    pub attempt_count: i32,
    pub response_code: Option<i32>,
    pub response_snippet: Option<String>,
    pub latency_ms: Option<i32>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<WebhookDelivery> for DeliveryResponse {
    fn from(d: WebhookDelivery) -> Self {
        Self {
            id: d.id,
            endpoint_id: d.endpoint_id,
            event_id: d.event_id,
            event_type: d.event_type,
            status: d.status,
            attempt_count: d.attempt_count,
            response_code: d.response_code,
            response_snippet: d.response_snippet,
            latency_ms: d.latency_ms,
            next_retry_at: d.next_retry_at,
            delivered_at: d.delivered_at,
            created_at: d.created_at,
        }
    }
}

/// Paginated delivery listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryListResponse {
    pub items: Vec<DeliveryResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Replay acknowledgement.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReplayResponse {
    pub success: bool,
}
