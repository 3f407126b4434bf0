//! Delivery task model — the durable queue record.
//!
//! Tasks survive process restarts; an in-flight task whose lease expires is
//! returned to the queue and redelivered (at-least-once). At most one live
//! task exists per event, enforced by a partial unique index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Queue-level status of a delivery task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for its `next_attempt_at` to come due.
    Queued,
    /// Claimed by a worker; redelivered if the lease expires unacked.
    Leased,
    /// Acknowledged by a worker; will not run again.
    Completed,
    /// Retry budget exhausted; will not run again.
    Abandoned,
}

/// A durable delivery task keyed by event ID.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub id: Uuid,

    /// Tenant owning the referenced event.
    pub tenant_id: Uuid,

    /// The event to deliver.
    pub event_id: Uuid,

    pub status: TaskStatus,

    /// 1-based number of the attempt currently (or last) in flight.
    /// Incremented by the queue when the task is leased; the worker derives
    /// "is this the last attempt" from this counter, never from live
    /// configuration.
    pub attempt: i32,

    /// Total attempts allowed, frozen at enqueue time.
    pub max_attempts: i32,

    /// Exponential backoff base in seconds, frozen at enqueue time.
    pub backoff_base_secs: i64,

    /// Earliest time the task may next be leased.
    pub next_attempt_at: DateTime<Utc>,

    /// Lease expiry for an in-flight task.
    pub leased_until: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for enqueueing a delivery task.
#[derive(Debug, Clone)]
pub struct EnqueueDeliveryTask {
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
}

impl DeliveryTask {
    /// Enqueue a delivery task for an event.
    ///
    /// De-duplicates against the live-task index: if a queued or leased
    /// task already exists for the event, no new task is created and
    /// `None` is returned.
    pub async fn enqueue(
        pool: &sqlx::PgPool,
        input: &EnqueueDeliveryTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO delivery_tasks (
                tenant_id, event_id, max_attempts, backoff_base_secs
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id) WHERE status IN ('queued', 'leased')
            DO NOTHING
            RETURNING *
            ",
        )
        .bind(input.tenant_id)
        .bind(input.event_id)
        .bind(input.max_attempts)
        .bind(input.backoff_base_secs)
        .fetch_optional(pool)
        .await
    }

    /// Atomically claim the next due task, if any.
    ///
    /// The claim leases the task for `lease_secs` and increments its
    /// attempt counter. `FOR UPDATE SKIP LOCKED` keeps concurrent workers
    /// from ever leasing the same task.
    pub async fn lease_due(
        pool: &sqlx::PgPool,
        lease_secs: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE delivery_tasks
            SET status = 'leased',
                attempt = attempt + 1,
                leased_until = NOW() + make_interval(secs => $1::double precision),
                updated_at = NOW()
            WHERE id = (
                SELECT id FROM delivery_tasks
                WHERE status = 'queued' AND next_attempt_at <= NOW()
                ORDER BY next_attempt_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            ",
        )
        .bind(lease_secs)
        .fetch_optional(pool)
        .await
    }

    /// Acknowledge a task: it completed (successfully or with a terminal
    /// event outcome already recorded) and must not run again.
    pub async fn ack(pool: &sqlx::PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE delivery_tasks
            SET status = 'completed', leased_until = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'leased'
            ",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Return a task to the queue, due again after `delay_secs`.
    pub async fn nack_with_delay(
        pool: &sqlx::PgPool,
        id: Uuid,
        delay_secs: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE delivery_tasks
            SET status = 'queued',
                leased_until = NULL,
                next_attempt_at = NOW() + make_interval(secs => $2::double precision),
                updated_at = NOW()
            WHERE id = $1 AND status = 'leased'
            ",
        )
        .bind(id)
        .bind(delay_secs)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Abandon a task whose retry budget is exhausted.
    pub async fn abandon(pool: &sqlx::PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE delivery_tasks
            SET status = 'abandoned', leased_until = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'leased'
            ",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Return expired leases to the queue for immediate redelivery.
    ///
    /// A worker that crashed mid-delivery leaves its task leased; once the
    /// lease runs out the task becomes due again. This is where the
    /// at-least-once guarantee comes from.
    pub async fn reap_expired_leases(pool: &sqlx::PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE delivery_tasks
            SET status = 'queued',
                leased_until = NULL,
                next_attempt_at = NOW(),
                updated_at = NOW()
            WHERE status = 'leased' AND leased_until < NOW()
            ",
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
