//! Tenant context extraction.
//!
//! Caller identity is resolved upstream (gateway / auth proxy); the relay
//! trusts the propagated `X-Tenant-ID` header. The middleware validates the
//! header and inserts a `TenantContext` into request extensions for
//! handlers to read via `Extension<TenantContext>`.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::RelayError;

/// Header carrying the caller's tenant, set by the upstream auth layer.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Tenant context for the current request.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    tenant_id: Uuid,
}

impl TenantContext {
    #[must_use]
    pub fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id }
    }

    #[must_use]
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

/// Middleware requiring a valid tenant header on every request.
pub async fn require_tenant(mut request: Request, next: Next) -> Result<Response, RelayError> {
    let tenant_id = tenant_id_from_header(
        request
            .headers()
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok()),
    )?;

    request
        .extensions_mut()
        .insert(TenantContext::new(tenant_id));

    Ok(next.run(request).await)
}

/// Parse the tenant header value. Missing, empty, or non-UUID values are
/// rejected.
fn tenant_id_from_header(value: Option<&str>) -> Result<Uuid, RelayError> {
    let value = value.ok_or(RelayError::Unauthorized)?;
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(RelayError::Unauthorized);
    }

    trimmed.parse::<Uuid>().map_err(|_| RelayError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uuid_header() {
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        let parsed = tenant_id_from_header(Some(uuid)).unwrap();
        assert_eq!(parsed.to_string(), uuid);
    }

    #[test]
    fn test_header_with_whitespace() {
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        let padded = format!("  {uuid}  ");
        let parsed = tenant_id_from_header(Some(&padded)).unwrap();
        assert_eq!(parsed.to_string(), uuid);
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(matches!(
            tenant_id_from_header(None),
            Err(RelayError::Unauthorized)
        ));
    }

    #[test]
    fn test_empty_header_rejected() {
        assert!(matches!(
            tenant_id_from_header(Some("   ")),
            Err(RelayError::Unauthorized)
        ));
    }

    #[test]
    fn test_invalid_uuid_rejected() {
        assert!(matches!(
            tenant_id_from_header(Some("not-a-uuid")),
            Err(RelayError::Unauthorized)
        ));
    }
}
