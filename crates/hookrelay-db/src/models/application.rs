//! Application (target registry) model.
//!
//! Maps `(tenant_id, name)` to a single delivery target URL. Registration
//! is an upsert: registering the same name again overwrites the URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered application: one named delivery destination per tenant.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Application {
    /// Unique identifier for the application.
    pub id: Uuid,

    /// The tenant this application belongs to.
    pub tenant_id: Uuid,

    /// Application name, e.g. "Zoom". Unique per tenant.
    pub name: String,

    /// Webhook delivery target URL. NULL means "no target configured" —
    /// tolerated here, rejected at delivery time.
    pub target_url: Option<String>,

    /// When the application was registered.
    pub created_at: DateTime<Utc>,

    /// When the target URL was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for registering or updating an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertApplication {
    pub name: String,
    pub target_url: Option<String>,
}

impl Application {
    /// Register an application, or update its target URL if the name is
    /// already taken for this tenant. Never creates a duplicate.
    pub async fn upsert(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        input: &UpsertApplication,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO applications (tenant_id, name, target_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, name)
            DO UPDATE SET target_url = EXCLUDED.target_url, updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.target_url)
        .fetch_one(pool)
        .await
    }

    /// Find an application by name within a tenant.
    pub async fn find_by_name(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM applications
            WHERE tenant_id = $1 AND name = $2
            ",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Find an application by ID within a tenant.
    pub async fn find_by_id(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM applications
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    /// List all applications for a tenant, newest first.
    pub async fn list_by_tenant(
        pool: &sqlx::PgPool,
        tenant_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM applications
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }
}
