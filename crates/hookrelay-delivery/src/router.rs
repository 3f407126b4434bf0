//! Axum router setup for the relay API.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::handlers::{applications, events, ingest};
use crate::queue::{DeliveryQueue, RetryPolicy};
use crate::services::ingest_service::IngestService;
use crate::tenant;

/// Shared state for relay handlers.
#[derive(Clone)]
pub struct RelayState {
    pub ingest_service: Arc<IngestService>,
    pub queue: Arc<dyn DeliveryQueue>,
    pub policy: RetryPolicy,
    /// Allow plain-HTTP target URLs (development only).
    pub allow_http_targets: bool,
    pool: PgPool,
}

impl RelayState {
    /// Create a new relay state with an injected queue.
    pub fn new(
        pool: PgPool,
        queue: Arc<dyn DeliveryQueue>,
        policy: RetryPolicy,
        allow_http_targets: bool,
    ) -> Self {
        Self {
            ingest_service: Arc::new(IngestService::new(pool.clone(), queue.clone(), policy)),
            queue,
            policy,
            allow_http_targets,
            pool,
        }
    }

    /// Get a reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Creates the relay router with all routes. Every route requires a tenant
/// context.
pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        // Ingestion
        .route(
            "/webhooks/receive/:application",
            post(ingest::receive_webhook_handler),
        )
        // Status & replay
        .route("/webhooks/events", get(events::list_events_handler))
        .route(
            "/webhooks/events/:id/replay",
            post(events::replay_event_handler),
        )
        // Target registry
        .route(
            "/applications",
            post(applications::upsert_application_handler)
                .get(applications::list_applications_handler),
        )
        .layer(axum::middleware::from_fn(tenant::require_tenant))
        .with_state(state)
}
