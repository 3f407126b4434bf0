//! Application (target registry) handlers.

use axum::extract::State;
use axum::{Extension, Json};
use validator::Validate;

use hookrelay_db::models::{Application, UpsertApplication};

use crate::error::{ApiResult, RelayError};
use crate::models::{ApplicationListResponse, ApplicationResponse, UpsertApplicationRequest};
use crate::router::RelayState;
use crate::tenant::TenantContext;
use crate::validation::validate_target_url;

/// Register an application or update its target URL.
///
/// Registering an existing name overwrites the URL — never creates a
/// duplicate.
#[utoipa::path(
    post,
    path = "/applications",
    tag = "Applications",
    request_body = UpsertApplicationRequest,
    responses(
        (status = 200, description = "Application registered or updated", body = ApplicationResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn upsert_application_handler(
    State(state): State<RelayState>,
    Extension(ctx): Extension<TenantContext>,
    Json(request): Json<UpsertApplicationRequest>,
) -> ApiResult<Json<ApplicationResponse>> {
    request
        .validate()
        .map_err(|e| RelayError::Validation(e.to_string()))?;

    // An absent or empty target is tolerated (deferred to delivery time);
    // a present one must be a safe, well-formed URL.
    let target_url = match request.target_url.as_deref() {
        Some(url) if !url.is_empty() => {
            validate_target_url(url, state.allow_http_targets)?;
            Some(url.to_string())
        }
        _ => None,
    };

    let application = Application::upsert(
        state.pool(),
        ctx.tenant_id(),
        &UpsertApplication {
            name: request.name,
            target_url,
        },
    )
    .await?;

    Ok(Json(ApplicationResponse::from(application)))
}

/// List the calling tenant's registered applications.
#[utoipa::path(
    get,
    path = "/applications",
    tag = "Applications",
    responses(
        (status = 200, description = "Application list", body = ApplicationListResponse),
        (status = 401, description = "Missing tenant context"),
    ),
)]
pub async fn list_applications_handler(
    State(state): State<RelayState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<ApplicationListResponse>> {
    let applications = Application::list_by_tenant(state.pool(), ctx.tenant_id()).await?;

    let items = applications
        .into_iter()
        .map(ApplicationResponse::from)
        .collect();

    Ok(Json(ApplicationListResponse { items }))
}
