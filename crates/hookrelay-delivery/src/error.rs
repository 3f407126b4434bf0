//! Error types for the delivery engine.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Delivery engine error variants.
///
/// Transient vs. permanent delivery failure is deliberately not here: the
/// worker records those as event status transitions, never as errors
/// surfaced to a caller.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No application named '{0}' is configured for this tenant")]
    TargetNotConfigured(String),

    #[error("Event not found")]
    EventNotFound,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SSRF protection: {0}")]
    SsrfDetected(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error response returned by the API endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            RelayError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            RelayError::TargetNotConfigured(_) => {
                (StatusCode::NOT_FOUND, "target_not_configured")
            }
            RelayError::EventNotFound => (StatusCode::NOT_FOUND, "event_not_found"),
            RelayError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            RelayError::SsrfDetected(_) => (StatusCode::BAD_REQUEST, "ssrf_detected"),
            RelayError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            RelayError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            RelayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_not_configured_maps_to_404() {
        let response = RelayError::TargetNotConfigured("Zoom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_event_not_found_maps_to_404() {
        let response = RelayError::EventNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = RelayError::Validation("name is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = RelayError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
