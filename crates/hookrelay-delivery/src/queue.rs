//! Durable delivery queue abstraction.
//!
//! The queue is modeled as an explicit interface (`enqueue`/`lease`/`ack`/
//! `nack_with_delay`) rather than a concrete dependency, and injected into
//! the ingestion path, the replay handler, and the worker. The Postgres
//! implementation leases tasks with `FOR UPDATE SKIP LOCKED` so no two
//! workers ever process the same task concurrently, and returns expired
//! leases to the queue so a crashed worker's task is redelivered at least
//! once.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use hookrelay_db::models::{DeliveryTask, EnqueueDeliveryTask};

use crate::error::RelayError;

/// Default total delivery attempts per task (initial + 4 retries).
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Default exponential backoff base: 60s, doubling per attempt
/// (60s, 120s, 240s, 480s between attempts 1-5).
pub const DEFAULT_BACKOFF_BASE_SECS: i64 = 60;

/// Retry policy applied to a delivery task at enqueue time.
///
/// The policy is frozen onto the task row, so configuration changes never
/// affect tasks already in flight.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
        }
    }
}

/// Calculate the backoff delay after a failed attempt.
///
/// `attempt` is the 1-based number of the attempt that just failed:
/// attempt 1 -> base, attempt 2 -> base*2, attempt 3 -> base*4, ...
/// The shift is clamped so a large attempt number cannot overflow.
#[must_use]
pub fn backoff_delay(attempt: i32, base_secs: i64) -> Duration {
    let exponent = attempt.saturating_sub(1).clamp(0, 32) as u32;
    let secs = base_secs.saturating_mul(1i64 << exponent);
    Duration::from_secs(secs.max(0) as u64)
}

/// The durable delivery queue contract.
///
/// Returning from `lease` with a task gives the caller exclusive ownership
/// until the lease expires; the caller must finish with exactly one of
/// `ack`, `nack_with_delay`, or `abandon`.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Enqueue a delivery task for an event under the given policy.
    ///
    /// Returns `false` when a live task already exists for the event and
    /// the request was de-duplicated.
    async fn enqueue(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        policy: &RetryPolicy,
    ) -> Result<bool, RelayError>;

    /// Claim the next due task, leasing it for `lease`. Returns `None`
    /// when nothing is due.
    async fn lease(&self, lease: Duration) -> Result<Option<DeliveryTask>, RelayError>;

    /// Mark a leased task finished; it will never run again.
    async fn ack(&self, task_id: Uuid) -> Result<(), RelayError>;

    /// Return a leased task to the queue, due again after `delay`.
    async fn nack_with_delay(&self, task_id: Uuid, delay: Duration) -> Result<(), RelayError>;

    /// Mark a leased task abandoned (retry budget exhausted).
    async fn abandon(&self, task_id: Uuid) -> Result<(), RelayError>;

    /// Return expired leases to the queue. Returns the number reaped.
    async fn reap_expired(&self) -> Result<u64, RelayError>;
}

/// Postgres-backed delivery queue.
#[derive(Clone)]
pub struct PgDeliveryQueue {
    pool: PgPool,
}

impl PgDeliveryQueue {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryQueue for PgDeliveryQueue {
    async fn enqueue(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        policy: &RetryPolicy,
    ) -> Result<bool, RelayError> {
        let task = DeliveryTask::enqueue(
            &self.pool,
            &EnqueueDeliveryTask {
                tenant_id,
                event_id,
                max_attempts: policy.max_attempts,
                backoff_base_secs: policy.backoff_base_secs,
            },
        )
        .await?;

        if task.is_none() {
            tracing::debug!(
                target: "delivery_queue",
                event_id = %event_id,
                "Enqueue de-duplicated — live task already exists"
            );
        }

        Ok(task.is_some())
    }

    async fn lease(&self, lease: Duration) -> Result<Option<DeliveryTask>, RelayError> {
        let task = DeliveryTask::lease_due(&self.pool, lease.as_secs() as i64).await?;
        Ok(task)
    }

    async fn ack(&self, task_id: Uuid) -> Result<(), RelayError> {
        DeliveryTask::ack(&self.pool, task_id).await?;
        Ok(())
    }

    async fn nack_with_delay(&self, task_id: Uuid, delay: Duration) -> Result<(), RelayError> {
        DeliveryTask::nack_with_delay(&self.pool, task_id, delay.as_secs() as i64).await?;
        Ok(())
    }

    async fn abandon(&self, task_id: Uuid) -> Result<(), RelayError> {
        DeliveryTask::abandon(&self.pool, task_id).await?;
        Ok(())
    }

    async fn reap_expired(&self) -> Result<u64, RelayError> {
        let reaped = DeliveryTask::reap_expired_leases(&self.pool).await?;
        Ok(reaped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_base() {
        // Default policy: 60s, 120s, 240s, 480s
        assert_eq!(backoff_delay(1, 60), Duration::from_secs(60));
        assert_eq!(backoff_delay(2, 60), Duration::from_secs(120));
        assert_eq!(backoff_delay(3, 60), Duration::from_secs(240));
        assert_eq!(backoff_delay(4, 60), Duration::from_secs(480));
    }

    #[test]
    fn test_backoff_custom_base() {
        assert_eq!(backoff_delay(1, 5), Duration::from_secs(5));
        assert_eq!(backoff_delay(3, 5), Duration::from_secs(20));
    }

    #[test]
    fn test_backoff_zero_attempt_clamps_to_base() {
        assert_eq!(backoff_delay(0, 60), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_large_attempt_does_not_overflow() {
        let delay = backoff_delay(1000, 60);
        assert!(delay.as_secs() > 0);
    }

    #[test]
    fn test_default_policy_matches_reference() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_base_secs, 60);
    }
}
