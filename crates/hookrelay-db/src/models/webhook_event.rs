//! Webhook event model.
//!
//! One row per received webhook call, carrying the captured request data,
//! the delivery status, and the append-only attempt history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Delivery status of a webhook event.
///
/// `Success` and `Failed` are terminal: no automatic retry runs against the
/// event again until an explicit replay resets it to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Created, first delivery not yet attempted.
    Pending,
    /// At least one attempt failed; another retry is scheduled.
    Retrying,
    /// Delivered (2xx response). Terminal.
    Success,
    /// Attempts exhausted or no target configured. Terminal.
    Failed,
}

impl EventStatus {
    /// Whether this status stops the automatic retry pipeline.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Success | EventStatus::Failed)
    }
}

/// One recorded delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AttemptRecord {
    /// When the attempt completed.
    pub at: DateTime<Utc>,

    /// HTTP status code of the response, if one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,

    /// Round-trip latency in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,

    /// Transport or configuration error, if the call produced no response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A received webhook event plus its full delivery history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Unique identifier, assigned at creation.
    pub id: Uuid,

    /// The tenant this event belongs to. Every read/write is scoped by it.
    pub tenant_id: Uuid,

    /// The application the event was received for.
    pub application_id: Uuid,

    /// Captured request headers. Immutable once stored.
    pub headers: Json<serde_json::Value>,

    /// Captured request body. Immutable once stored; this exact payload is
    /// what gets POSTed to the target on every attempt.
    pub payload: Json<serde_json::Value>,

    /// Delivery destination, snapshotted from the registry at ingestion.
    /// NULL means no target was configured for the application.
    pub target_url: Option<String>,

    /// Current delivery status.
    pub status: EventStatus,

    /// Count of delivery attempts made so far. Always equals
    /// `attempt_log.len()`.
    pub attempts: i32,

    /// Append-only attempt history.
    pub attempt_log: Json<Vec<AttemptRecord>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for persisting a newly received webhook.
#[derive(Debug, Clone)]
pub struct CreateWebhookEvent {
    pub tenant_id: Uuid,
    pub application_id: Uuid,
    pub headers: serde_json::Value,
    pub payload: serde_json::Value,
    pub target_url: Option<String>,
}

impl WebhookEvent {
    /// Persist a new event in `pending` state with an empty attempt log.
    pub async fn create(
        pool: &sqlx::PgPool,
        input: &CreateWebhookEvent,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_events (
                tenant_id, application_id, headers, payload, target_url
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(input.tenant_id)
        .bind(input.application_id)
        .bind(&input.headers)
        .bind(&input.payload)
        .bind(&input.target_url)
        .fetch_one(pool)
        .await
    }

    /// Find an event by ID within a tenant.
    pub async fn find_by_id(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM webhook_events
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    /// List events for a tenant, newest first, with an optional exact
    /// status filter.
    pub async fn list_by_tenant(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        status: Option<EventStatus>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_as(
                    r"
                    SELECT * FROM webhook_events
                    WHERE tenant_id = $1 AND status = $2
                    ORDER BY created_at DESC
                    LIMIT $3
                    ",
                )
                .bind(tenant_id)
                .bind(status)
                .bind(limit)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r"
                    SELECT * FROM webhook_events
                    WHERE tenant_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    ",
                )
                .bind(tenant_id)
                .bind(limit)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Record one delivery attempt and move the event to `status`.
    ///
    /// The counter increment, the log append, and the status change happen
    /// in a single statement so `attempts == attempt_log.len()` holds in
    /// every state a reader can observe, even with concurrent writers.
    pub async fn record_attempt(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        id: Uuid,
        status: EventStatus,
        record: &AttemptRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record_json = serde_json::to_value(record).map_err(|e| sqlx::Error::Encode(e.into()))?;

        sqlx::query_as(
            r"
            UPDATE webhook_events
            SET status = $3,
                attempts = attempts + 1,
                attempt_log = attempt_log || jsonb_build_array($4::jsonb),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .bind(record_json)
        .fetch_optional(pool)
        .await
    }

    /// Reset a (typically terminal) event back to `pending` for replay.
    ///
    /// Attempts and the attempt log are deliberately left untouched:
    /// history accumulates across replays.
    pub async fn reset_for_replay(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE webhook_events
            SET status = 'pending', updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }
}
