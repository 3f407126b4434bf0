//! Event status and replay handlers.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use hookrelay_db::models::WebhookEvent;

use crate::error::{ApiResult, RelayError};
use crate::models::{EventListResponse, EventResponse, ListEventsQuery, ReplayResponse};
use crate::router::RelayState;
use crate::tenant::TenantContext;

/// List events for the calling tenant, newest first.
#[utoipa::path(
    get,
    path = "/webhooks/events",
    tag = "Webhooks",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Event list", body = EventListResponse),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn list_events_handler(
    State(state): State<RelayState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<Json<EventListResponse>> {
    let limit = query.limit.clamp(1, 200);

    let events =
        WebhookEvent::list_by_tenant(state.pool(), ctx.tenant_id(), query.status, limit).await?;

    let items = events.into_iter().map(EventResponse::from).collect();

    Ok(Json(EventListResponse { items, limit }))
}

/// Manually re-enqueue an event for delivery.
///
/// The event is reset to `pending` and a delivery task is enqueued with the
/// same policy as fresh ingestion. Attempts and the attempt log are never
/// reset — history accumulates across replays. Replaying an event that is
/// already queued is accepted; the queue de-duplicates and `enqueued` is
/// reported `false`.
#[utoipa::path(
    post,
    path = "/webhooks/events/{id}/replay",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Event ID"),
    ),
    responses(
        (status = 200, description = "Event queued for redelivery", body = ReplayResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "Event unknown or not owned by this tenant"),
    ),
)]
pub async fn replay_event_handler(
    State(state): State<RelayState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReplayResponse>> {
    let tenant_id = ctx.tenant_id();

    // Reset to pending first so a task already in flight (or the one about
    // to be enqueued) finds the event enqueue-eligible, not terminal.
    let event = WebhookEvent::reset_for_replay(state.pool(), tenant_id, id)
        .await?
        .ok_or(RelayError::EventNotFound)?;

    let enqueued = state
        .queue
        .enqueue(tenant_id, event.id, &state.policy)
        .await?;

    tracing::info!(
        target: "webhook_delivery",
        event_id = %event.id,
        tenant_id = %tenant_id,
        enqueued,
        "Event replay requested"
    );

    Ok(Json(ReplayResponse {
        success: true,
        queued: event.id,
        enqueued,
    }))
}
