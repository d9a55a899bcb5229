//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use fastpaze::net::Listener;
use fastpaze::Engine;
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// Build a request with an optional JSON body.
pub fn request(method: Method, uri: &str, json_body: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match json_body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Drive one request through `router` and return the raw response.
pub async fn call(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

/// Drive one request and decode the JSON body.
pub async fn call_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = call(router, request).await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Serve `engine` on an ephemeral local port.
pub async fn start_server(engine: Arc<Engine>) -> (SocketAddr, JoinHandle<()>) {
    let listener = Listener::bind("127.0.0.1:0", 64, true).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        engine.serve(listener).await.unwrap();
    });

    // give the accept loop a moment to start
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
}
