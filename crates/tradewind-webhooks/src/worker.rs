//! Background delivery worker.
//!
//! A worker drains the set of due delivery rows: rows just fanned out
//! (`next_retry_at = now`) and rows whose retry backoff has lapsed. Two
//! triggers feed it — publish notifications for low latency, and a poll
//! interval as the safety net that also picks up scheduled retries and
//! leases lapsed by crashed workers. Multiple workers can run against the
//! same database; row claiming keeps them off each other's deliveries.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::services::delivery_service::DeliveryService;
use crate::services::event_publisher::PublishedEvent;

/// Default poll interval for due deliveries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default rows claimed per drain pass.
pub const DEFAULT_BATCH_SIZE: i64 = 20;

/// Delivery worker processing due rows until cancelled.
pub struct WebhookWorker {
    delivery_service: DeliveryService,
    notify_rx: broadcast::Receiver<PublishedEvent>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    batch_size: i64,
}

impl WebhookWorker {
    /// Create a new worker.
    #[must_use]
    pub fn new(
        delivery_service: DeliveryService,
        notify_rx: broadcast::Receiver<PublishedEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            delivery_service,
            notify_rx,
            shutdown,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the claim batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch: i64) -> Self {
        self.batch_size = batch;
        self
    }

    /// Run until the cancellation token fires.
    pub async fn run(mut self) {
        tracing::info!(
            target: "webhook_delivery",
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            "Delivery worker started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.drain_due().await;
                }
                result = self.notify_rx.recv() => match result {
                    Ok(notice) => {
                        tracing::debug!(
                            target: "webhook_delivery",
                            event_id = %notice.event_id,
                            fan_out = notice.fan_out,
                            "Publish notification received"
                        );
                        if notice.fan_out > 0 {
                            self.drain_due().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            target: "webhook_delivery",
                            skipped,
                            "Worker lagged behind publish notifications; draining"
                        );
                        self.drain_due().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Publisher dropped; the poll tick still covers
                        // scheduled retries until shutdown.
                        self.poll_only(ticker).await;
                        break;
                    }
                },
            }
        }

        tracing::info!(target: "webhook_delivery", "Delivery worker stopped");
    }

    /// Poll-driven loop used once the notification channel is gone.
    async fn poll_only(&self, mut ticker: tokio::time::Interval) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    self.drain_due().await;
                }
            }
        }
    }

    /// Claim and process due rows until a pass comes back short.
    async fn drain_due(&self) {
        loop {
            match self.delivery_service.process_due(self.batch_size).await {
                Ok(processed) => {
                    if (processed as i64) < self.batch_size {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        target: "webhook_delivery",
                        error = %e,
                        "Failed to claim due deliveries"
                    );
                    break;
                }
            }
        }
    }
}
