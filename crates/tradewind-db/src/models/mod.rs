//! Row models for the webhook delivery & API credential subsystem.

pub mod api_credential;
pub mod webhook_delivery;
pub mod webhook_endpoint;
pub mod webhook_event;

pub use api_credential::{ApiCredential, CreateApiCredential, CredentialStatus};
pub use webhook_delivery::{
    CreateWebhookDelivery, DeliveryFilter, DeliveryStatus, WebhookDelivery,
};
pub use webhook_endpoint::{CreateWebhookEndpoint, EndpointStatus, WebhookEndpoint};
pub use webhook_event::{CreateWebhookEvent, WebhookEvent};
