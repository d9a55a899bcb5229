//! Access logging.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::http::request::X_REQUEST_ID;
use crate::middleware::client_key;
use crate::observability::metrics;

/// Log method, path, client, elapsed time and final status once the inner handler returns.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_key(&request);
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        client = %client,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        status,
        "Request completed"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}
