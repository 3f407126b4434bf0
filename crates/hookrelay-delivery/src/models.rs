//! Request and response types for the relay API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use hookrelay_db::models::{AttemptRecord, EventStatus, WebhookEvent};

/// Response to a received webhook: the event is persisted and queued, the
/// resolved application name is echoed back for confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiveWebhookResponse {
    pub success: bool,
    pub id: Uuid,
    pub application: String,
}

/// Query parameters for listing events.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListEventsQuery {
    /// Exact-match status filter.
    pub status: Option<EventStatus>,
    /// Max events to return (default 50, clamped to 1..=200).
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// One event with its delivery history.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub status: EventStatus,
    pub attempts: i32,
    pub target_url: Option<String>,
    pub attempt_log: Vec<AttemptRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookEvent> for EventResponse {
    fn from(e: WebhookEvent) -> Self {
        Self {
            id: e.id,
            application_id: e.application_id,
            status: e.status,
            attempts: e.attempts,
            target_url: e.target_url,
            attempt_log: e.attempt_log.0,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Event list, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    pub items: Vec<EventResponse>,
    pub limit: i64,
}

/// Response to a replay request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReplayResponse {
    pub success: bool,
    /// The replayed event ID.
    pub queued: Uuid,
    /// False when a live delivery task already existed for the event and
    /// the queue de-duplicated the request.
    pub enqueued: bool,
}

/// Request to register an application or update its target URL.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertApplicationRequest {
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub name: String,
    /// Delivery target. Omitting it registers the name with no target,
    /// which is tolerated until delivery time.
    pub target_url: Option<String>,
}

/// A registered application.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub name: String,
    pub target_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<hookrelay_db::models::Application> for ApplicationResponse {
    fn from(a: hookrelay_db::models::Application) -> Self {
        Self {
            id: a.id,
            name: a.name,
            target_url: a.target_url,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Application list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationListResponse {
    pub items: Vec<ApplicationResponse>,
}
