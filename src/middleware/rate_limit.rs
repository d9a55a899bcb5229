//! Sliding-window rate limiting keyed by client address.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::response::ErrorResponse;
use crate::middleware::client_key;
use crate::observability::metrics;

/// Per-client sliding window.
///
/// Each client keeps the timestamps of its accepted requests. On every check the
/// timestamps older than the window are pruned; the request is rejected once the
/// remaining count reaches the cap. State is sharded by client key (`DashMap`), so
/// unrelated clients do not contend on one lock.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    clients: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Check and record a request happening now.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Check and record a request at `now`. Returns false if the client is over the cap.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut stamps = self.clients.entry(key.to_string()).or_default();
        prune(&mut stamps, now, self.window);

        if stamps.len() >= self.max_requests {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drop clients with no requests left in their window. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = stamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

/// Middleware function for sliding-window rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<SlidingWindowLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    if limiter.check(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        ErrorResponse::new(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
            .with_description("Too many requests, please try again later")
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_within_window() {
        let limiter = SlidingWindowLimiter::new(100, Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..100 {
            assert!(limiter.check_at("1.2.3.4", start + Duration::from_millis(i)));
        }
        assert!(!limiter.check_at("1.2.3.4", start + Duration::from_secs(1)));
    }

    #[test]
    fn test_accepts_after_window_elapses() {
        let limiter = SlidingWindowLimiter::new(100, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..100 {
            assert!(limiter.check_at("c", start));
        }
        assert!(!limiter.check_at("c", start + Duration::from_secs(59)));
        assert!(limiter.check_at("c", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_rejected_requests_are_not_recorded() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at("c", start));
        assert!(limiter.check_at("c", start + Duration::from_secs(5)));
        assert!(!limiter.check_at("c", start + Duration::from_secs(6)));
        // the first stamp expires at +10s, the rejected one never counted
        assert!(limiter.check_at("c", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
        assert!(limiter.check_at("b", now));
    }

    #[test]
    fn test_sweep_drops_idle_clients() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(1));
        let start = Instant::now();
        limiter.check_at("a", start);
        limiter.check_at("b", start + Duration::from_millis(900));
        assert_eq!(limiter.sweep(start + Duration::from_millis(1500)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
