//! Background delivery worker.
//!
//! Polls the durable queue for due tasks, runs each through the delivery
//! state machine, and signals the queue outcome. Several loops can share
//! one queue: the lease claim is atomic, so concurrency across distinct
//! events is free while each task has exactly one delivery in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::queue::{backoff_delay, DeliveryQueue};
use crate::services::delivery_service::{DeliveryService, TaskDisposition};

/// Default interval between queue polls when nothing is due.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default task lease window. Comfortably above the delivery timeout so a
/// healthy in-flight call cannot lose its lease.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// Polling worker that drains the delivery queue.
pub struct DeliveryWorker {
    service: DeliveryService,
    queue: Arc<dyn DeliveryQueue>,
    poll_interval: Duration,
    lease: Duration,
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(service: DeliveryService, queue: Arc<dyn DeliveryQueue>) -> Self {
        Self {
            service,
            queue,
            poll_interval: DEFAULT_POLL_INTERVAL,
            lease: DEFAULT_LEASE,
        }
    }

    /// Override the poll interval (default: 5 seconds).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the lease window (default: 60 seconds).
    #[must_use]
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Run the delivery loop until cancelled. Spawn via `tokio::spawn`;
    /// spawn several for concurrent delivery.
    ///
    /// Each iteration:
    /// 1. Returns expired leases to the queue (crash recovery).
    /// 2. Claims one due task and processes it.
    /// 3. Signals the queue outcome — strictly after the event row was
    ///    persisted by the service.
    /// 4. Sleeps only when the queue was empty.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            target: "webhook_delivery",
            poll_interval_secs = self.poll_interval.as_secs(),
            lease_secs = self.lease.as_secs(),
            "Delivery worker started"
        );

        loop {
            if cancel.is_cancelled() {
                tracing::info!(
                    target: "webhook_delivery",
                    "Delivery worker received cancel signal, shutting down"
                );
                break;
            }

            match self.queue.reap_expired().await {
                Ok(reaped) if reaped > 0 => {
                    tracing::warn!(
                        target: "webhook_delivery",
                        reaped,
                        "Returned expired task leases to the queue"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(
                        target: "webhook_delivery",
                        error = %e,
                        "Failed to reap expired leases"
                    );
                }
            }

            match self.poll_and_process().await {
                Ok(true) => {
                    // Processed a task — immediately check for the next one.
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        target: "webhook_delivery",
                        error = %e,
                        "Delivery worker encountered an error"
                    );
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Claim and process one due task.
    /// Returns `Ok(true)` if a task was processed, `Ok(false)` if none was due.
    async fn poll_and_process(&self) -> Result<bool, crate::error::RelayError> {
        let Some(task) = self.queue.lease(self.lease).await? else {
            return Ok(false);
        };

        match self.service.process_task(&task).await {
            Ok(TaskDisposition::Ack) => {
                self.queue.ack(task.id).await?;
            }
            Ok(TaskDisposition::Abandon) => {
                self.queue.abandon(task.id).await?;
            }
            Ok(TaskDisposition::RetryAfter(delay)) => {
                self.queue.nack_with_delay(task.id, delay).await?;
            }
            Err(e) => {
                // The attempt could not be recorded; return the task to the
                // queue so it is redelivered (at-least-once).
                tracing::error!(
                    target: "webhook_delivery",
                    task_id = %task.id,
                    event_id = %task.event_id,
                    error = %e,
                    "Failed to process delivery task, rescheduling"
                );
                self.queue
                    .nack_with_delay(
                        task.id,
                        backoff_delay(task.attempt, task.backoff_base_secs),
                    )
                    .await?;
            }
        }

        Ok(true)
    }
}
