//! Durable event publication and fan-out.
//!
//! `publish` records the event and creates one pending delivery row per
//! matching active endpoint inside a single transaction — the event can never
//! commit without its fan-out. A broadcast notification then nudges the
//! delivery worker so fresh rows are picked up without waiting for the next
//! poll tick; delivery outcomes never propagate back to the publish caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::WebhookError;
use crate::validation;
use tradewind_db::models::{
    CreateWebhookDelivery, CreateWebhookEvent, WebhookDelivery, WebhookEndpoint, WebhookEvent,
};

/// Notification sent to delivery workers after a publish commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub event_id: Uuid,
    pub tenant_id: Uuid,
    pub event_type: String,
    pub fan_out: usize,
    pub published_at: DateTime<Utc>,
}

/// Publisher recording events and fanning them out to subscribed endpoints.
#[derive(Clone)]
pub struct EventPublisher {
    pool: PgPool,
    notify_tx: broadcast::Sender<PublishedEvent>,
}

impl EventPublisher {
    /// Create a publisher and the first worker-side receiver.
    #[must_use]
    pub fn new(pool: PgPool, capacity: usize) -> (Self, broadcast::Receiver<PublishedEvent>) {
        let (notify_tx, notify_rx) = broadcast::channel(capacity);
        (Self { pool, notify_tx }, notify_rx)
    }

    /// Get a new receiver for publish notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.notify_tx.subscribe()
    }

    /// Record an event and fan it out.
    ///
    /// One transaction covers the event insert and all delivery inserts: a
    /// failure rolls everything back and surfaces to the caller, so an event
    /// row can never silently lack its deliveries. Zero matching endpoints is
    /// not an error — the event is still recorded.
    pub async fn publish(
        &self,
        tenant_id: Uuid,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<WebhookEvent, WebhookError> {
        validation::validate_event_type(event_type)?;

        let mut tx = self.pool.begin().await?;

        let event = WebhookEvent::create(
            &mut *tx,
            CreateWebhookEvent {
                tenant_id,
                event_type: event_type.to_string(),
                payload,
            },
        )
        .await?;

        let endpoints =
            WebhookEndpoint::find_active_subscribed(&mut *tx, tenant_id, event_type).await?;

        let mut fan_out = 0usize;
        for endpoint in &endpoints {
            let created = WebhookDelivery::create(
                &mut *tx,
                CreateWebhookDelivery {
                    tenant_id,
                    endpoint_id: endpoint.id,
                    event_id: event.id,
                    event_type: event_type.to_string(),
                },
            )
            .await?;
            if created.is_some() {
                fan_out += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            target: "webhook_delivery",
            event_id = %event.id,
            event_type = %event.event_type,
            tenant_id = %tenant_id,
            fan_out,
            "Published event"
        );

        // Fire-and-forget wake-up; a lapsed worker falls back to polling.
        let notice = PublishedEvent {
            event_id: event.id,
            tenant_id,
            event_type: event.event_type.clone(),
            fan_out,
            published_at: event.created_at,
        };
        if self.notify_tx.send(notice).is_err() {
            tracing::debug!(
                target: "webhook_delivery",
                event_id = %event.id,
                "No delivery worker listening for publish notifications"
            );
        }

        Ok(event)
    }
}
