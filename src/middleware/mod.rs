//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! register("logging"), register("cors"), register("rate_limiter")
//!     → pipeline keeps [Logging, Cors, RateLimiter] in registration order
//!
//! apply(router):
//!     wrap in reverse order → Logging( Cors( RateLimiter( dispatcher ) ) )
//!     the first registered middleware runs first and finishes last
//! ```
//!
//! # Design Decisions
//! - Built-ins are a closed enum; names are resolved once at registration
//! - Unknown names are logged and ignored
//! - Each rate limiter entry owns its own window state

pub mod cors;
pub mod logging;
pub mod rate_limit;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use axum::{extract::ConnectInfo, http::Request, middleware, Router};

use crate::config::RateLimitConfig;

pub use cors::cors_middleware;
pub use logging::logging_middleware;
pub use rate_limit::{rate_limit_middleware, SlidingWindowLimiter};

/// Built-in middleware kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareKind {
    Logging,
    Cors,
    RateLimiter,
}

impl MiddlewareKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MiddlewareKind::Logging => "logging",
            MiddlewareKind::Cors => "cors",
            MiddlewareKind::RateLimiter => "rate_limiter",
        }
    }
}

impl fmt::Display for MiddlewareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized middleware names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown middleware: {0}")]
pub struct UnknownMiddleware(pub String);

impl FromStr for MiddlewareKind {
    type Err = UnknownMiddleware;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "logging" => Ok(MiddlewareKind::Logging),
            "cors" => Ok(MiddlewareKind::Cors),
            "rate_limiter" => Ok(MiddlewareKind::RateLimiter),
            other => Err(UnknownMiddleware(other.to_string())),
        }
    }
}

/// Ordered list of enabled middleware.
#[derive(Debug, Default)]
pub struct MiddlewarePipeline {
    entries: RwLock<Vec<MiddlewareKind>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware by name. Disabled entries and unknown names are skipped.
    pub fn register(&self, name: &str, enabled: bool) -> Option<MiddlewareKind> {
        if !enabled {
            tracing::debug!(middleware = %name, "Middleware disabled, skipping");
            return None;
        }
        match name.parse::<MiddlewareKind>() {
            Ok(kind) => {
                self.push(kind);
                Some(kind)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring middleware registration");
                None
            }
        }
    }

    pub fn push(&self, kind: MiddlewareKind) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(kind);
        tracing::info!(middleware = %kind, "Registered middleware");
    }

    /// Snapshot in registration order.
    pub fn kinds(&self) -> Vec<MiddlewareKind> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wrap `router` so the first registered middleware is the outermost layer.
    ///
    /// Returns the wrapped router and the rate limiters it created, so the caller
    /// can run housekeeping on them.
    pub fn apply(
        &self,
        router: Router,
        rate_limit: &RateLimitConfig,
    ) -> (Router, Vec<Arc<SlidingWindowLimiter>>) {
        let mut router = router;
        let mut limiters = Vec::new();

        for kind in self.kinds().into_iter().rev() {
            router = match kind {
                MiddlewareKind::Logging => router.layer(middleware::from_fn(logging_middleware)),
                MiddlewareKind::Cors => router.layer(middleware::from_fn(cors_middleware)),
                MiddlewareKind::RateLimiter => {
                    let limiter = Arc::new(SlidingWindowLimiter::from_config(rate_limit));
                    limiters.push(Arc::clone(&limiter));
                    router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
                }
            };
        }

        (router, limiters)
    }
}

/// Peer address attached by the transport, if any.
pub fn client_addr<B>(request: &Request<B>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Key identifying a client: its IP, or `unknown` without peer information.
pub fn client_key<B>(request: &Request<B>) -> String {
    client_addr(request)
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
