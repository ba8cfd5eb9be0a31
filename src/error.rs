use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dto::envelope::{ApiEnvelope, ErrorDetail},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed or could not be reached.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("{0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("{0}")]
    NotFound(String),
    /// Stored data could not be interpreted.
    #[error("{0}")]
    Unknown(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { collection, id } => {
                ServiceError::NotFound(format!("document `{id}` not found in `{collection}`"))
            }
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Unknown(format!("malformed stored document: {err}"))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::Internal(source.to_string()),
            ServiceError::Degraded => {
                AppError::ServiceUnavailable("storage unavailable (degraded mode)".into())
            }
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Unknown(message) => AppError::Internal(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let payload = Json(ApiEnvelope::failure(ErrorDetail {
            error: self.to_string(),
        }));

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_maps_to_not_found() {
        let err: ServiceError = StorageError::not_found("jugadores", "p9").into();
        assert!(matches!(err, ServiceError::NotFound(ref msg) if msg.contains("p9")));
        assert_eq!(AppError::from(err).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failure_is_internal_while_degraded_is_unavailable() {
        let io = std::io::Error::other("connection reset");
        let err: ServiceError = StorageError::unavailable("read failed".into(), io).into();
        assert_eq!(AppError::from(err).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::from(ServiceError::Degraded).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn invalid_input_is_bad_request() {
        let err = AppError::from(ServiceError::InvalidInput("missing torneo".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "missing torneo");
    }
}
