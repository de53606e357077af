use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Wrapper for API responses that adds the success envelope.
///
/// Object payloads are flattened beside `success`, so `{"pages": [...]}`
/// goes out as `{"success": true, "pages": [...]}`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl ApiResponse<()> {
    /// Bare `{"success": true}`
    pub fn ok() -> Self {
        Self::success(())
    }
}

pub fn envelope(data: Value) -> Value {
    let mut envelope = json!({ "success": true });
    if let (Value::Object(target), Value::Object(fields)) = (&mut envelope, data) {
        for (key, value) in fields {
            if key != "success" {
                target.insert(key, value);
            }
        }
    }
    envelope
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        (status, Json(envelope(data_value))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_payloads_are_flattened() {
        let body = envelope(json!({"pages": [{"id": 1, "name": "Alpha"}]}));
        assert_eq!(body, json!({"success": true, "pages": [{"id": 1, "name": "Alpha"}]}));
    }

    #[test]
    fn unit_payload_is_bare_success() {
        assert_eq!(envelope(json!(null)), json!({"success": true}));
    }

    #[test]
    fn payload_cannot_override_success() {
        assert_eq!(envelope(json!({"success": false})), json!({"success": true}));
    }
}
