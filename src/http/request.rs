//! Request intake.
//!
//! # Responsibilities
//! - Request ID generation and propagation (`x-request-id`)
//! - Enforce the body size limit before and during the body read
//! - Bound the body read by the read timeout
//! - Convert an axum request into a buffered [`DispatchRequest`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A declared `Content-Length` over the limit is rejected without reading

use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, HeaderName, StatusCode},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::dispatcher::DispatchRequest;
use crate::http::response::ErrorResponse;
use crate::routing::parse_query;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a UUID v4 request ID to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Buffer `request` into a [`DispatchRequest`].
pub async fn read_request(
    request: Request,
    max_body_bytes: usize,
    read_timeout: Duration,
) -> Result<DispatchRequest, ErrorResponse> {
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > max_body_bytes) {
        return Err(body_too_large(max_body_bytes));
    }

    let body = match tokio::time::timeout(read_timeout, axum::body::to_bytes(body, max_body_bytes)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Request body read failed");
            return Err(body_too_large(max_body_bytes));
        }
        Err(_) => {
            return Err(
                ErrorResponse::new(StatusCode::REQUEST_TIMEOUT, "Request timeout")
                    .with_description("The request body was not received in time"),
            );
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok(DispatchRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parse_query(parts.uri.query()),
        headers,
        content_type,
        body,
    })
}

fn body_too_large(limit: usize) -> ErrorResponse {
    ErrorResponse::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
        .with_description(format!("The request body exceeds the limit of {limit} bytes"))
}
