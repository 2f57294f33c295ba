//! Axum handlers for the webhook subsystem API.

pub mod api_keys;
pub mod deliveries;
pub mod endpoints;
pub mod events;
