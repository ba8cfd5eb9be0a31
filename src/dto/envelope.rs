use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Outcome flag carried by every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ApiStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FALLO")]
    Failure,
}

/// Uniform `{status, data}` wrapper around every response body.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub status: ApiStatus,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: ApiStatus::Ok,
            data,
        }
    }

    pub fn failure(data: T) -> Self {
        Self {
            status: ApiStatus::Failure,
            data,
        }
    }
}

/// Payload of a failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub error: String,
}

/// Successful handler response: a status code plus an `OK` envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub body: ApiEnvelope<T>,
}

impl<T> ApiResponse<T> {
    /// `200 OK` response.
    pub fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    /// `201 Created` response.
    pub fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    pub fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            status,
            body: ApiEnvelope::ok(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelopes_use_wire_status_names() {
        let ok = serde_json::to_value(ApiEnvelope::ok(json!([1, 2]))).unwrap();
        assert_eq!(ok, json!({"status": "OK", "data": [1, 2]}));

        let failed = serde_json::to_value(ApiEnvelope::failure(ErrorDetail {
            error: "boom".into(),
        }))
        .unwrap();
        assert_eq!(failed, json!({"status": "FALLO", "data": {"error": "boom"}}));
    }
}
