//! Response envelopes.
//!
//! # Responsibilities
//! - Success envelope `{"message": ..., "data"?: ...}`
//! - Error envelope `{"error": ..., "status_code": ..., "description"?: ...}`
//! - Convert both into `application/json` axum responses
//!
//! # Design Decisions
//! - Envelopes are encoded eagerly into a [`JsonBody`] so an encoding failure
//!   can still be answered with a 500 error envelope

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Fallback body when even the error envelope cannot be encoded.
const INTERNAL_ERROR_BODY: &str = r#"{"error":"Internal server error","status_code":500}"#;

/// Success envelope for plain-text templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }
}

/// Error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status_code: status.as_u16(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn into_body(self) -> JsonBody {
        let status = self.status();
        match serde_json::to_string(&self) {
            Ok(body) => JsonBody { status, body },
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode error envelope");
                JsonBody::internal_error()
            }
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        self.into_body().into_response()
    }
}

/// An encoded JSON response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBody {
    pub status: StatusCode,
    pub body: String,
}

impl JsonBody {
    pub fn ok(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// Encode a serializable value as a 200 response, or a 500 error envelope on failure.
    pub fn encode<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::ok(body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response");
                ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .with_description(e.to_string())
                    .into_body()
            }
        }
    }

    pub fn internal_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: INTERNAL_ERROR_BODY.to_string(),
        }
    }
}

impl IntoResponse for JsonBody {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_omits_empty_description() {
        let body = ErrorResponse::new(StatusCode::NOT_FOUND, "Route not found").into_body();
        assert_eq!(body.status, StatusCode::NOT_FOUND);
        assert_eq!(body.body, r#"{"error":"Route not found","status_code":404}"#);
    }

    #[test]
    fn test_error_envelope_with_description() {
        let body = ErrorResponse::new(StatusCode::BAD_REQUEST, "Invalid JSON body")
            .with_description("expected value at line 1 column 1")
            .into_body();
        let json: Value = serde_json::from_str(&body.body).unwrap();
        assert_eq!(json["status_code"], 400);
        assert_eq!(json["description"], "expected value at line 1 column 1");
    }

    #[test]
    fn test_success_envelope() {
        let body = JsonBody::encode(&ApiResponse::new("Hello"));
        assert_eq!(body.body, r#"{"message":"Hello"}"#);

        let body = JsonBody::encode(
            &ApiResponse::new("Hello").with_data(Some(serde_json::json!({"id": "7"}))),
        );
        assert_eq!(body.body, r#"{"message":"Hello","data":{"id":"7"}}"#);
    }

    #[test]
    fn test_content_type_is_json() {
        let response = JsonBody::ok("{}".to_string()).into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
    }
}
