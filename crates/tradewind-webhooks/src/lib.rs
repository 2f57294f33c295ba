//! Webhook delivery subsystem for the Tradewind commerce platform.
//!
//! Provides tenant-scoped API credential issuance, webhook endpoint
//! management, durable event publication with per-endpoint fan-out, signed
//! HTTP delivery with exponential-backoff retries and dead-lettering, and
//! operator replay of individual deliveries.

pub mod crypto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod tenant;
pub mod validation;
pub mod worker;

pub use error::WebhookError;
pub use models::CommerceEventType;
pub use router::{webhooks_router, WebhooksState};
pub use services::event_publisher::{EventPublisher, PublishedEvent};
pub use worker::WebhookWorker;
