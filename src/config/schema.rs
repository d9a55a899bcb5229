//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::routing::{ParameterMetadata, RequestBodyInfo};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Transport tunables.
    pub server: ServerConfig,

    /// Rate limiter window and cap.
    pub rate_limit: RateLimitConfig,

    /// Logging, debug data and metrics.
    pub observability: ObservabilityConfig,

    /// Declarative route table.
    pub routes: Vec<RouteConfig>,

    /// Middleware, in wrap order (first = outermost).
    pub middleware: Vec<MiddlewareConfig>,

    /// Named dependency values.
    pub dependencies: BTreeMap<String, String>,
}

/// Server tunables. Read-only once the transport is running.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Time allowed to read a request body, in milliseconds.
    pub read_timeout_ms: u64,

    /// Time allowed for handling and writing a response, in milliseconds.
    pub write_timeout_ms: u64,

    /// Keep-alive idle time before the connection is closed, in milliseconds.
    pub idle_timeout_ms: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Maximum concurrent connections (backpressure).
    pub concurrency: usize,

    /// Enable TCP keep-alive on accepted sockets.
    pub tcp_keepalive: bool,

    /// Trade throughput for smaller per-connection buffers.
    pub reduce_memory_usage: bool,

    /// Listen port: `8080`, `:8080` or `host:port`.
    pub port: String,

    /// How long shutdown waits for in-flight connections, in milliseconds.
    pub shutdown_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 5_000,
            write_timeout_ms: 10_000,
            idle_timeout_ms: 30_000,
            max_body_bytes: 4 * 1024 * 1024,
            concurrency: 256 * 1024,
            tcp_keepalive: true,
            reduce_memory_usage: true,
            port: ":8080".to_string(),
            shutdown_grace_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Socket address to bind, derived from `port`.
    pub fn bind_address(&self) -> String {
        let port = self.port.trim();
        if let Some(rest) = port.strip_prefix(':') {
            format!("0.0.0.0:{rest}")
        } else if port.contains(':') {
            port.to_string()
        } else {
            format!("0.0.0.0:{port}")
        }
    }

    /// Apply the positive fields of `update`.
    ///
    /// Zero and `None` mean "not set". Returns the names of fields that were given
    /// a negative value or a blank port and were therefore rejected.
    pub fn apply(&mut self, update: &ServerConfigUpdate) -> Vec<&'static str> {
        let mut rejected = Vec::new();

        if let Some(v) = setting("read_timeout_ms", update.read_timeout_ms, &mut rejected) {
            self.read_timeout_ms = v;
        }
        if let Some(v) = setting("write_timeout_ms", update.write_timeout_ms, &mut rejected) {
            self.write_timeout_ms = v;
        }
        if let Some(v) = setting("idle_timeout_ms", update.idle_timeout_ms, &mut rejected) {
            self.idle_timeout_ms = v;
        }
        if let Some(v) = setting("max_body_bytes", update.max_body_bytes, &mut rejected)
            .and_then(|v| usize::try_from(v).ok())
        {
            self.max_body_bytes = v;
        }
        if let Some(v) = setting("concurrency", update.concurrency, &mut rejected)
            .and_then(|v| usize::try_from(v).ok())
        {
            self.concurrency = v;
        }
        match update.port.as_deref().map(str::trim) {
            Some("") => rejected.push("port"),
            Some(port) => self.port = port.to_string(),
            None => {}
        }

        rejected
    }
}

fn setting(name: &'static str, value: i64, rejected: &mut Vec<&'static str>) -> Option<u64> {
    if value < 0 {
        rejected.push(name);
    }
    positive(value)
}

fn positive(value: i64) -> Option<u64> {
    u64::try_from(value).ok().filter(|v| *v > 0)
}

/// A reconfiguration request. Non-positive numbers and an empty port mean "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfigUpdate {
    pub read_timeout_ms: i64,
    pub write_timeout_ms: i64,
    pub idle_timeout_ms: i64,
    pub max_body_bytes: i64,
    pub concurrency: i64,
    pub port: Option<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per client within the window.
    pub max_requests: usize,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Attach resolved parameters and parsed body to responses.
    pub include_debug_data: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            include_debug_data: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A route declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path pattern, e.g. `/users/{id}`.
    pub path: String,

    /// HTTP method (case-insensitive).
    #[serde(default = "default_method")]
    pub method: String,

    /// Response template, plain text or JSON.
    pub message: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,

    #[serde(default)]
    pub request_body: Option<RequestBodyInfo>,

    /// Extra documented responses keyed by status code.
    #[serde(default)]
    pub responses: BTreeMap<String, String>,

    /// Names of dependencies this route requires.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// A middleware entry in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MiddlewareConfig {
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
