//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router around the dispatcher
//! - Wire up layers (request ID, write timeout, registered middleware)
//! - Answer a request that outlives the write timeout with a 408 error envelope
//! - Serve HTTP/1.1 and HTTP/2 connections from the bounded listener
//! - Stop accepting on shutdown, then drain in-flight connections
//!
//! # Layer order (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → middleware pipeline → Timeout → dispatch
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto::Builder,
};
use tower::ServiceExt;

use crate::config::{RateLimitConfig, ServerConfig};
use crate::http::dispatcher::Dispatcher;
use crate::http::request::{propagate_request_id_layer, read_request, set_request_id_layer};
use crate::http::response::ErrorResponse;
use crate::lifecycle::Shutdown;
use crate::middleware::{MiddlewarePipeline, SlidingWindowLimiter};
use crate::net::{ConnectionTracker, Listener, ListenerError};

/// Smallest read buffer hyper accepts; used when memory use should be reduced.
const REDUCED_BUF_SIZE: usize = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into the dispatch handler.
#[derive(Debug, Clone)]
struct AppState {
    dispatcher: Dispatcher,
    max_body_bytes: usize,
    read_timeout: Duration,
}

/// HTTP server for the routing engine.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    limiters: Vec<Arc<SlidingWindowLimiter>>,
}

impl HttpServer {
    pub fn new(
        dispatcher: Dispatcher,
        pipeline: &MiddlewarePipeline,
        config: ServerConfig,
        rate_limit: &RateLimitConfig,
    ) -> Self {
        let state = AppState {
            dispatcher,
            max_body_bytes: config.max_body_bytes,
            read_timeout: config.read_timeout(),
        };
        let (router, limiters) = Self::build_router(&config, pipeline, rate_limit, state);
        Self {
            router,
            config,
            limiters,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ServerConfig,
        pipeline: &MiddlewarePipeline,
        rate_limit: &RateLimitConfig,
        state: AppState,
    ) -> (Router, Vec<Arc<SlidingWindowLimiter>>) {
        let router = Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                config.write_timeout(),
                enforce_write_timeout,
            ));

        let (router, limiters) = pipeline.apply(router, rate_limit);

        let router = router
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer());

        (router, limiters)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` is triggered, then drain connections.
    pub async fn run(self, listener: Listener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            read_timeout_ms = self.config.read_timeout_ms,
            write_timeout_ms = self.config.write_timeout_ms,
            idle_timeout_ms = self.config.idle_timeout_ms,
            max_body_bytes = self.config.max_body_bytes,
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        for limiter in &self.limiters {
            spawn_sweeper(Arc::clone(limiter), shutdown.clone());
        }

        let builder = Arc::new(self.connection_builder());
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(conn) => conn,
                        Err(ListenerError::Closed) => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            continue;
                        }
                    };

                    let guard = tracker.track();
                    let conn_id = guard.id();
                    let router = self.router.clone();
                    let builder = Arc::clone(&builder);
                    let shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        let _guard = guard;

                        let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
                            request.extensions_mut().insert(ConnectInfo(peer));
                            router.clone().oneshot(request)
                        });

                        let conn = builder.serve_connection(TokioIo::new(stream), service);
                        tokio::pin!(conn);

                        tokio::select! {
                            result = conn.as_mut() => {
                                if let Err(e) = result {
                                    tracing::debug!(connection_id = %conn_id, peer_addr = %peer, error = %e, "Connection closed with error");
                                }
                            }
                            _ = shutdown.wait() => {
                                conn.as_mut().graceful_shutdown();
                                if let Err(e) = conn.as_mut().await {
                                    tracing::debug!(connection_id = %conn_id, peer_addr = %peer, error = %e, "Connection closed with error during shutdown");
                                }
                            }
                        }
                    });
                }
                _ = shutdown.wait() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        // release the listening socket before draining
        drop(listener);

        let grace = self.config.shutdown_grace();
        if tokio::time::timeout(grace, tracker.wait_for_drain()).await.is_err() {
            tracing::warn!(
                remaining = tracker.active_count(),
                grace_ms = self.config.shutdown_grace_ms,
                "Grace period elapsed with connections still open"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn connection_builder(&self) -> Builder<TokioExecutor> {
        let mut builder = Builder::new(TokioExecutor::new());
        {
            let mut http1 = builder.http1();
            http1
                .timer(TokioTimer::new())
                .keep_alive(true)
                .header_read_timeout(self.config.idle_timeout());
            if self.config.reduce_memory_usage {
                http1.max_buf_size(REDUCED_BUF_SIZE);
            }
        }
        builder.http2().timer(TokioTimer::new());
        builder
    }
}

/// Terminal handler: buffer the request and hand it to the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    match read_request(request, state.max_body_bytes, state.read_timeout).await {
        Ok(request) => state.dispatcher.dispatch(&request).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Bound the time from dispatch to a complete response.
async fn enforce_write_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(%method, %path, timeout_ms = limit.as_millis() as u64, "Write timeout elapsed");
            ErrorResponse::new(StatusCode::REQUEST_TIMEOUT, "Request timeout")
                .with_description("The response was not produced within the write timeout")
                .into_response()
        }
    }
}

/// Periodically drop idle clients from a rate limiter until shutdown.
fn spawn_sweeper(limiter: Arc<SlidingWindowLimiter>, shutdown: Shutdown) {
    let period = limiter.window().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.sweep(Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, tracked = limiter.tracked_clients(), "Rate limiter sweep");
                    }
                }
                _ = shutdown.wait() => break,
            }
        }
    });
}
