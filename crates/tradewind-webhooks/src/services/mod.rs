//! Business-logic services for the webhook subsystem.

pub mod credential_service;
pub mod delivery_service;
pub mod endpoint_service;
pub mod event_publisher;
pub mod replay_service;
