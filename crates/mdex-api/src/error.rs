//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

/// API-surface error with an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(mdex_core::Error),
}

impl From<mdex_core::Error> for ApiError {
    fn from(err: mdex_core::Error) -> Self {
        match &err {
            mdex_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            mdex_core::Error::JobNotFound(id) => ApiError::NotFound(format!("Job {id} not found")),
            mdex_core::Error::MetadataNotFound(id) => {
                ApiError::NotFound(format!("No metadata for document {id}"))
            }
            mdex_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            mdex_core::Error::Forbidden(msg) => ApiError::Forbidden(msg.clone()),
            mdex_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    return ApiError::Conflict(msg);
                }
                ApiError::Internal(err)
            }
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_not_found_mapping() {
        let err = ApiError::from(mdex_core::Error::JobNotFound(Uuid::nil()));
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err = ApiError::from(mdex_core::Error::InvalidInput("bad selector".into()));
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_opaque_errors_map_to_internal() {
        let err = ApiError::from(mdex_core::Error::Internal("boom".into()));
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
