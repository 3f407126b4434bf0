//! OpenAPI document for the relay API.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use hookrelay_delivery::handlers;

/// API documentation aggregated from the handler annotations.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "hookrelay API",
        description = "Multi-tenant webhook ingestion and delivery relay"
    ),
    paths(
        handlers::ingest::receive_webhook_handler,
        handlers::events::list_events_handler,
        handlers::events::replay_event_handler,
        handlers::applications::upsert_application_handler,
        handlers::applications::list_applications_handler,
    ),
    components(schemas(
        hookrelay_delivery::models::ReceiveWebhookResponse,
        hookrelay_delivery::models::EventResponse,
        hookrelay_delivery::models::EventListResponse,
        hookrelay_delivery::models::ReplayResponse,
        hookrelay_delivery::models::UpsertApplicationRequest,
        hookrelay_delivery::models::ApplicationResponse,
        hookrelay_delivery::models::ApplicationListResponse,
        hookrelay_delivery::error::ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON.
pub fn openapi_routes() -> Router {
    Router::new().route(
        "/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
