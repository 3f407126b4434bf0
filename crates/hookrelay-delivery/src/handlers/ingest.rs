//! Webhook ingestion handler.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};

use crate::error::ApiResult;
use crate::models::ReceiveWebhookResponse;
use crate::router::RelayState;
use crate::tenant::TenantContext;

/// Receive an incoming webhook for a named application.
///
/// The raw JSON body and request headers are captured verbatim; delivery
/// happens asynchronously.
#[utoipa::path(
    post,
    path = "/webhooks/receive/{application}",
    tag = "Webhooks",
    params(
        ("application" = String, Path, description = "Registered application name"),
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Event persisted and queued for delivery", body = ReceiveWebhookResponse),
        (status = 401, description = "Missing tenant context"),
        (status = 404, description = "No application mapping for this tenant"),
    ),
)]
pub async fn receive_webhook_handler(
    State(state): State<RelayState>,
    Extension(ctx): Extension<TenantContext>,
    Path(application): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<ReceiveWebhookResponse>> {
    let (event, application_name) = state
        .ingest_service
        .receive(
            ctx.tenant_id(),
            &application,
            headers_to_json(&headers),
            payload,
        )
        .await?;

    Ok(Json(ReceiveWebhookResponse {
        success: true,
        id: event.id,
        application: application_name,
    }))
}

/// Convert request headers to a JSON object for storage.
fn headers_to_json(headers: &HeaderMap) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            map.insert(name.to_string(), serde_json::Value::String(v.to_string()));
        }
    }
    serde_json::Value::Object(map)
}
