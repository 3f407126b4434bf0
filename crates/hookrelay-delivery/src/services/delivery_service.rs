//! Delivery attempt execution.
//!
//! Owns the attempt/outcome state machine: loads the event for a leased
//! task, performs the outbound HTTP POST, records the attempt atomically,
//! and decides whether the task is done, retried, or abandoned.
//!
//! Ordering invariant: the event row is always persisted before the
//! disposition is returned, so the queue outcome is signaled strictly after
//! the model reflects the new status.

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use sqlx::PgPool;
use uuid::Uuid;

use hookrelay_db::models::{AttemptRecord, DeliveryTask, EventStatus, WebhookEvent};

use crate::error::RelayError;
use crate::queue::backoff_delay;

/// Fixed timeout for outbound delivery calls.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(7);

/// What the worker should tell the queue after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskDisposition {
    /// Task finished (success, terminal failure already recorded, or
    /// nothing to do). Remove it from the queue.
    Ack,
    /// Retry budget exhausted; the terminal `failed` status is already
    /// recorded on the event.
    Abandon,
    /// Transient failure; reschedule after the given delay.
    RetryAfter(Duration),
}

/// Outcome of one outbound HTTP call.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    /// Response status, if a response was received at all.
    pub status_code: Option<i32>,
    pub latency_ms: i64,
    /// Transport error description when no response was received.
    pub error: Option<String>,
}

impl AttemptResult {
    /// A delivery counts as successful only for a 2xx response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }
}

/// Service executing delivery attempts against tenant target URLs.
#[derive(Clone)]
pub struct DeliveryService {
    pool: PgPool,
    http_client: Client,
}

impl DeliveryService {
    /// Create a new delivery service with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the HTTP client cannot be built.
    pub fn new(pool: PgPool, timeout: Duration) -> Result<Self, RelayError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent("hookrelay/1.0")
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { pool, http_client })
    }

    /// Process one leased delivery task through the state machine.
    ///
    /// Never performs queue operations itself — the returned disposition is
    /// the worker's instruction, issued only after the event row has been
    /// persisted.
    pub async fn process_task(&self, task: &DeliveryTask) -> Result<TaskDisposition, RelayError> {
        let Some(event) =
            WebhookEvent::find_by_id(&self.pool, task.tenant_id, task.event_id).await?
        else {
            tracing::debug!(
                target: "webhook_delivery",
                event_id = %task.event_id,
                "Discarding delivery task — event not found"
            );
            return Ok(TaskDisposition::Ack);
        };

        // A task can outlive its event's pipeline run (e.g. a lease that
        // expired after the event already went terminal). Treat it as a
        // duplicate and drop it.
        if event.status.is_terminal() {
            tracing::debug!(
                target: "webhook_delivery",
                event_id = %event.id,
                status = ?event.status,
                "Discarding delivery task — event already terminal"
            );
            return Ok(TaskDisposition::Ack);
        }

        let Some(target_url) = event.target_url.as_deref().filter(|u| !u.is_empty()) else {
            // Not retried: no amount of retrying fixes a missing destination.
            let record = AttemptRecord {
                at: Utc::now(),
                status_code: None,
                latency_ms: None,
                error: Some("No target URL configured".to_string()),
            };
            WebhookEvent::record_attempt(
                &self.pool,
                task.tenant_id,
                event.id,
                EventStatus::Failed,
                &record,
            )
            .await?;

            tracing::warn!(
                target: "webhook_delivery",
                event_id = %event.id,
                tenant_id = %event.tenant_id,
                "Event failed — no target URL configured"
            );
            return Ok(TaskDisposition::Ack);
        };

        let result = post_payload(&self.http_client, target_url, event.id, &event.payload.0).await;

        let (status, disposition) = classify_outcome(
            result.is_success(),
            task.attempt,
            task.max_attempts,
            task.backoff_base_secs,
        );

        let record = AttemptRecord {
            at: Utc::now(),
            status_code: result.status_code,
            latency_ms: Some(result.latency_ms),
            error: result.error.clone(),
        };

        // Persist before signaling the queue outcome so no reader ever
        // observes a retried task with a stale event status.
        WebhookEvent::record_attempt(&self.pool, task.tenant_id, event.id, status, &record)
            .await?;

        match status {
            EventStatus::Success => {
                tracing::info!(
                    target: "webhook_delivery",
                    event_id = %event.id,
                    tenant_id = %event.tenant_id,
                    attempt = task.attempt,
                    response_code = result.status_code,
                    latency_ms = result.latency_ms,
                    "Webhook delivered"
                );
            }
            _ => {
                tracing::warn!(
                    target: "webhook_delivery",
                    event_id = %event.id,
                    tenant_id = %event.tenant_id,
                    attempt = task.attempt,
                    max_attempts = task.max_attempts,
                    response_code = result.status_code,
                    error = result.error.as_deref(),
                    terminal = matches!(status, EventStatus::Failed),
                    "Webhook delivery attempt failed"
                );
            }
        }

        Ok(disposition)
    }
}

/// Classify an attempt outcome into the event's next status and the queue
/// disposition.
///
/// `attempt` is the task's own 1-based counter — the worker never re-reads
/// live configuration to decide whether this was the last attempt.
#[must_use]
pub fn classify_outcome(
    success: bool,
    attempt: i32,
    max_attempts: i32,
    backoff_base_secs: i64,
) -> (EventStatus, TaskDisposition) {
    if success {
        return (EventStatus::Success, TaskDisposition::Ack);
    }

    if attempt >= max_attempts {
        (EventStatus::Failed, TaskDisposition::Abandon)
    } else {
        (
            EventStatus::Retrying,
            TaskDisposition::RetryAfter(backoff_delay(attempt, backoff_base_secs)),
        )
    }
}

/// POST a stored payload to a target URL.
///
/// Any response status is a defined, non-exceptional outcome; only
/// transport failures (timeout, DNS, connection refused) produce an error
/// description.
pub async fn post_payload(
    client: &Client,
    target_url: &str,
    event_id: Uuid,
    payload: &serde_json::Value,
) -> AttemptResult {
    let start = Instant::now();
    let result = client
        .post(target_url)
        .header("X-Event-ID", event_id.to_string())
        .json(payload)
        .send()
        .await;

    let latency_ms = start.elapsed().as_millis() as i64;

    match result {
        Ok(response) => AttemptResult {
            status_code: Some(i32::from(response.status().as_u16())),
            latency_ms,
            error: None,
        },
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {e}")
            } else {
                format!("Request error: {e}")
            };

            AttemptResult {
                status_code: None,
                latency_ms,
                error: Some(error),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
