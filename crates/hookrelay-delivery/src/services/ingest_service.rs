//! Webhook ingestion.
//!
//! Resolves the owning application, persists the event, and enqueues a
//! delivery task. The target URL is snapshotted onto the event here; later
//! registry changes do not affect events already queued.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use hookrelay_db::models::{Application, CreateWebhookEvent, WebhookEvent};

use crate::error::RelayError;
use crate::queue::{DeliveryQueue, RetryPolicy};

/// Service handling the ingestion-to-persistence path.
#[derive(Clone)]
pub struct IngestService {
    pool: PgPool,
    queue: Arc<dyn DeliveryQueue>,
    policy: RetryPolicy,
}

impl IngestService {
    pub fn new(pool: PgPool, queue: Arc<dyn DeliveryQueue>, policy: RetryPolicy) -> Self {
        Self {
            pool,
            queue,
            policy,
        }
    }

    /// Receive a webhook call for `(tenant, application_name)`.
    ///
    /// Fails with `TargetNotConfigured` when no mapping exists. A mapping
    /// with an empty target URL is accepted — the event is created and
    /// queued, and fails at delivery time instead.
    ///
    /// Returns the new event and the resolved application name; delivery
    /// is asynchronous.
    pub async fn receive(
        &self,
        tenant_id: Uuid,
        application_name: &str,
        headers: serde_json::Value,
        payload: serde_json::Value,
    ) -> Result<(WebhookEvent, String), RelayError> {
        let application = Application::find_by_name(&self.pool, tenant_id, application_name)
            .await?
            .ok_or_else(|| RelayError::TargetNotConfigured(application_name.to_string()))?;

        let event = WebhookEvent::create(
            &self.pool,
            &CreateWebhookEvent {
                tenant_id,
                application_id: application.id,
                headers,
                payload,
                target_url: application.target_url.clone(),
            },
        )
        .await?;

        self.queue
            .enqueue(tenant_id, event.id, &self.policy)
            .await?;

        tracing::info!(
            target: "webhook_ingest",
            event_id = %event.id,
            tenant_id = %tenant_id,
            application = %application.name,
            has_target = event.target_url.is_some(),
            "Webhook received and queued"
        );

        Ok((event, application.name))
    }

    /// The retry policy applied to fresh ingestion — replay uses the same
    /// one.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}
