//! Operator replay of individual deliveries.
//!
//! Replay is "give this one more chance right now": the existing row is reset
//! (attempt count back to 1, status `pending`) and one transition runs
//! synchronously, outside the backoff schedule. No new row is created, so the
//! original attempt history survives only in logs and snippets.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::WebhookError;
use crate::services::delivery_service::{DeliveryService, CLAIM_LEASE_SECONDS};
use tradewind_db::models::WebhookDelivery;

/// Service resetting and immediately re-running deliveries.
#[derive(Clone)]
pub struct ReplayService {
    pool: PgPool,
    delivery_service: DeliveryService,
}

impl ReplayService {
    /// Create a new replay service.
    #[must_use]
    pub fn new(pool: PgPool, delivery_service: DeliveryService) -> Self {
        Self {
            pool,
            delivery_service,
        }
    }

    /// Replay one delivery, whatever its current status.
    ///
    /// The reset claims the row in the same statement, so a polling worker
    /// cannot race the synchronous attempt made here.
    pub async fn replay(&self, tenant_id: Uuid, delivery_id: Uuid) -> Result<(), WebhookError> {
        let delivery =
            WebhookDelivery::reset_for_replay(&self.pool, tenant_id, delivery_id, CLAIM_LEASE_SECONDS)
                .await?
                .ok_or(WebhookError::DeliveryNotFound)?;

        tracing::info!(
            target: "webhook_delivery",
            delivery_id = %delivery.id,
            endpoint_id = %delivery.endpoint_id,
            tenant_id = %tenant_id,
            "Replaying delivery"
        );

        self.delivery_service.execute(&delivery).await;
        Ok(())
    }
}
