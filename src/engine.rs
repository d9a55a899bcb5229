//! The engine service object.
//!
//! # Responsibilities
//! - Own the route registry, middleware pipeline, dependency store and settings
//! - Expose the registration surface (routes, middleware, dependencies, tunables)
//! - Build the HTTP server from the current state and run it until shutdown
//!
//! # Design Decisions
//! - Every piece of state lives on the engine instance, so tests can build
//!   isolated engines side by side
//! - Registration problems are logged and returned; none of them panic
//! - Server tunables are snapshotted when the server is built; later changes
//!   apply to the next start

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwap;
use axum::{http::Method, Router};

use crate::config::{EngineConfig, RateLimitConfig, RouteConfig, ServerConfig, ServerConfigUpdate};
use crate::dependencies::DependencyStore;
use crate::http::{Dispatcher, HttpServer, ServerError};
use crate::lifecycle::{spawn_signal_handler, Shutdown};
use crate::middleware::{MiddlewareKind, MiddlewarePipeline};
use crate::net::Listener;
use crate::observability::logging::{self, InvalidLogLevel, LogLevel};
use crate::routing::{parse_method, ParameterMetadata, Route, RouteOptions, RouteRegistry};

/// Errors returned by route registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    #[error("invalid parameter metadata: {0}")]
    InvalidParameters(#[from] serde_json::Error),

    #[error("invalid response status: {0:?}")]
    InvalidStatus(String),
}

pub struct Engine {
    registry: Arc<RouteRegistry>,
    pipeline: MiddlewarePipeline,
    dependencies: Arc<DependencyStore>,
    include_debug_data: Arc<AtomicBool>,
    log_level: ArcSwap<LogLevel>,
    server_config: RwLock<ServerConfig>,
    rate_limit: RwLock<RateLimitConfig>,
    shutdown: Shutdown,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RouteRegistry::new()),
            pipeline: MiddlewarePipeline::new(),
            dependencies: Arc::new(DependencyStore::new()),
            include_debug_data: Arc::new(AtomicBool::new(false)),
            log_level: ArcSwap::from_pointee(LogLevel::default()),
            server_config: RwLock::new(ServerConfig::default()),
            rate_limit: RwLock::new(RateLimitConfig::default()),
            shutdown: Shutdown::new(),
        }
    }

    /// Build an engine from a validated config file.
    ///
    /// Dependencies are registered before routes so route dependency checks see them.
    pub fn from_config(config: &EngineConfig) -> Self {
        let engine = Self::new();

        *engine.server_config.write().unwrap_or_else(PoisonError::into_inner) = config.server.clone();
        engine.set_rate_limit(config.rate_limit.clone());
        engine.set_include_debug_data(config.observability.include_debug_data);
        // the subscriber was installed with this level (or RUST_LOG), so only record it
        match config.observability.log_level.parse::<LogLevel>() {
            Ok(level) => engine.log_level.store(Arc::new(level)),
            Err(e) => tracing::warn!(error = %e, "Keeping default log level"),
        }

        for (name, value) in &config.dependencies {
            engine.register_dependency(name, value);
        }
        for entry in &config.middleware {
            engine.register_middleware(&entry.name, entry.enabled);
        }
        for route in &config.routes {
            if let Err(e) = engine.register_route_config(route) {
                tracing::warn!(path = %route.path, method = %route.method, error = %e, "Skipping route from config");
            }
        }

        engine
    }

    // --- routes ---

    /// Register a route without parameter metadata.
    pub fn register_route(
        &self,
        path: &str,
        method: &str,
        message: &str,
        description: &str,
    ) -> Result<(), RegistrationError> {
        let method = self.method(path, method)?;
        self.route(RouteOptions::new(path, method, message).description(description));
        Ok(())
    }

    /// Register a route with parameter metadata given as a JSON array.
    ///
    /// A malformed payload drops the whole registration. An empty string means no parameters.
    pub fn register_route_with_params(
        &self,
        path: &str,
        method: &str,
        message: &str,
        description: &str,
        parameters_json: &str,
    ) -> Result<(), RegistrationError> {
        let method = self.method(path, method)?;

        let parameters: Vec<ParameterMetadata> = if parameters_json.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(parameters_json).map_err(|e| {
                tracing::error!(path = %path, error = %e, "Dropping route with malformed parameter metadata");
                RegistrationError::from(e)
            })?
        };

        self.route(
            RouteOptions::new(path, method, message)
                .description(description)
                .parameters(parameters),
        );
        Ok(())
    }

    /// Register a fully described route. Returns true if it replaced an existing one.
    pub fn route(&self, options: RouteOptions) -> bool {
        for name in &options.dependencies {
            if !self.dependencies.contains(name) {
                tracing::warn!(path = %options.path, dependency = %name, "Route depends on an unregistered dependency");
            }
        }

        let (route, error) = Route::build(options);
        if let Some(e) = error {
            tracing::error!(
                route = %route.key,
                error = %e,
                "Malformed path pattern, route will only match its literal path"
            );
        }
        self.registry.register(route)
    }

    pub fn get(&self, path: &str, message: &str) -> bool {
        self.route(RouteOptions::new(path, Method::GET, message))
    }

    pub fn post(&self, path: &str, message: &str) -> bool {
        self.route(RouteOptions::new(path, Method::POST, message))
    }

    pub fn put(&self, path: &str, message: &str) -> bool {
        self.route(RouteOptions::new(path, Method::PUT, message))
    }

    pub fn delete(&self, path: &str, message: &str) -> bool {
        self.route(RouteOptions::new(path, Method::DELETE, message))
    }

    pub fn patch(&self, path: &str, message: &str) -> bool {
        self.route(RouteOptions::new(path, Method::PATCH, message))
    }

    fn register_route_config(&self, config: &RouteConfig) -> Result<(), RegistrationError> {
        let method = self.method(&config.path, &config.method)?;

        let mut options = RouteOptions::new(&config.path, method, &config.message)
            .description(&config.description)
            .parameters(config.parameters.clone());
        if let Some(body) = &config.request_body {
            options = options.request_body(body.clone());
        }
        for (status, description) in &config.responses {
            let status = status
                .parse::<u16>()
                .map_err(|_| RegistrationError::InvalidStatus(status.clone()))?;
            options = options.response(status, description);
        }
        for name in &config.dependencies {
            options = options.dependency(name);
        }

        self.route(options);
        Ok(())
    }

    fn method(&self, path: &str, method: &str) -> Result<Method, RegistrationError> {
        parse_method(method).ok_or_else(|| {
            tracing::error!(path = %path, method = %method, "Rejecting route with invalid method");
            RegistrationError::InvalidMethod(method.to_string())
        })
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    // --- middleware & dependencies ---

    /// Append a middleware. Unknown names and disabled entries are logged and skipped.
    pub fn register_middleware(&self, name: &str, enabled: bool) -> Option<MiddlewareKind> {
        self.pipeline.register(name, enabled)
    }

    pub fn middleware(&self) -> Vec<MiddlewareKind> {
        self.pipeline.kinds()
    }

    pub fn register_dependency(&self, name: &str, value: &str) {
        self.dependencies.register(name, value);
    }

    pub fn dependency(&self, name: &str) -> Option<String> {
        self.dependencies.get(name)
    }

    // --- settings ---

    /// Change the log level. Invalid names are rejected and the current level is kept.
    pub fn set_log_level(&self, level: &str) -> Result<LogLevel, InvalidLogLevel> {
        match level.parse::<LogLevel>() {
            Ok(parsed) => {
                self.log_level.store(Arc::new(parsed));
                logging::apply_level(parsed);
                tracing::info!(level = %parsed, "Log level set");
                Ok(parsed)
            }
            Err(e) => {
                tracing::warn!(error = %e, current = %self.log_level(), "Keeping current log level");
                Err(e)
            }
        }
    }

    pub fn log_level(&self) -> LogLevel {
        **self.log_level.load()
    }

    pub fn set_include_debug_data(&self, enabled: bool) {
        self.include_debug_data.store(enabled, Ordering::Relaxed);
        tracing::info!(enabled, "Debug data inclusion set");
    }

    pub fn include_debug_data(&self) -> bool {
        self.include_debug_data.load(Ordering::Relaxed)
    }

    /// Apply the positive fields of `update`; everything else keeps its value.
    pub fn set_server_config(&self, update: ServerConfigUpdate) {
        let mut config = self.server_config.write().unwrap_or_else(PoisonError::into_inner);
        let rejected = config.apply(&update);
        if !rejected.is_empty() {
            tracing::warn!(rejected = ?rejected, "Ignoring negative or blank server settings");
        }
        tracing::info!(
            port = %config.port,
            read_timeout_ms = config.read_timeout_ms,
            write_timeout_ms = config.write_timeout_ms,
            idle_timeout_ms = config.idle_timeout_ms,
            max_body_bytes = config.max_body_bytes,
            concurrency = config.concurrency,
            "Server configuration updated"
        );
    }

    pub fn server_config(&self) -> ServerConfig {
        self.server_config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the rate limiter settings used by limiters built from now on.
    pub fn set_rate_limit(&self, config: RateLimitConfig) {
        if config.max_requests == 0 || config.window_secs == 0 {
            tracing::warn!(
                max_requests = config.max_requests,
                window_secs = config.window_secs,
                "Ignoring non-positive rate limit settings"
            );
            return;
        }
        *self.rate_limit.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // --- serving ---

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.dependencies),
            Arc::clone(&self.include_debug_data),
        )
    }

    /// Build a server from the current state.
    pub fn build_server(&self) -> HttpServer {
        HttpServer::new(
            self.dispatcher(),
            &self.pipeline,
            self.server_config(),
            &self.rate_limit(),
        )
    }

    /// The fully layered router, without a listener.
    pub fn router(&self) -> Router {
        self.build_server().router()
    }

    /// Handle for stopping a running server.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serve on an already bound listener until the shutdown handle is triggered.
    pub async fn serve(&self, listener: Listener) -> Result<(), ServerError> {
        let server = self.build_server();
        tracing::info!(
            routes = self.registry.len(),
            middleware = ?self.pipeline.kinds(),
            "Starting server"
        );
        server.run(listener, self.shutdown.clone()).await
    }

    /// Bind the configured port and serve until SIGINT or SIGTERM.
    pub async fn start_server(&self) -> Result<(), ServerError> {
        let config = self.server_config();
        let listener = Listener::bind(&config.bind_address(), config.concurrency, config.tcp_keepalive).await?;
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(docs = %format!("http://{addr}/swagger/"), "API docs available");
        }

        let signals = spawn_signal_handler(self.shutdown.clone());
        let result = self.serve(listener).await;
        signals.abort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_route_rejects_bad_method() {
        let engine = Engine::new();
        let err = engine.register_route("/a", "FE TCH", "x", "").unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidMethod(_)));
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let engine = Engine::new();
        engine.register_route("/a", "get", "x", "").unwrap();
        assert!(engine.registry().find("/a", &Method::GET).is_some());
    }

    #[test]
    fn test_bad_parameter_json_drops_route() {
        let engine = Engine::new();
        let err = engine
            .register_route_with_params("/users/{id}", "GET", "x", "", "{not json")
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidParameters(_)));
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_parameter_json_is_stored() {
        let engine = Engine::new();
        engine
            .register_route_with_params(
                "/users/{id}",
                "GET",
                "x",
                "Get user",
                r#"[{"name":"id","in":"path","description":"User ID","required":true,"type":"integer"},
                    {"name":"verbose","in":"query"}]"#,
            )
            .unwrap();

        let found = engine.registry().find("/users/1", &Method::GET).unwrap();
        assert_eq!(found.route.parameters.len(), 2);
        assert_eq!(found.route.parameters[0].type_name, "integer");
        assert_eq!(found.route.parameters[1].type_name, "string");
        assert!(!found.route.parameters[1].required);
    }

    #[test]
    fn test_malformed_pattern_degrades_to_exact_match() {
        let engine = Engine::new();
        engine.register_route("/broken/{id", "GET", "x", "").unwrap();
        assert!(engine.registry().find("/broken/{id", &Method::GET).is_some());
        assert!(engine.registry().find("/broken/7", &Method::GET).is_none());
    }

    #[test]
    fn test_verb_shortcuts() {
        let engine = Engine::new();
        assert!(!engine.get("/r", "get"));
        engine.post("/r", "post");
        engine.put("/r", "put");
        engine.delete("/r", "delete");
        engine.patch("/r", "patch");
        assert!(engine.get("/r", "get again"));
        assert_eq!(engine.registry().len(), 5);
        assert_eq!(engine.registry().methods_for_path("/r").len(), 5);
    }

    #[test]
    fn test_invalid_log_level_keeps_previous() {
        let engine = Engine::new();
        assert_eq!(engine.set_log_level("debug"), Ok(LogLevel::Debug));
        assert!(engine.set_log_level("loud").is_err());
        assert_eq!(engine.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_server_config_zero_max_body_unchanged() {
        let engine = Engine::new();
        let before = engine.server_config().max_body_bytes;
        engine.set_server_config(ServerConfigUpdate {
            max_body_bytes: 0,
            port: Some(":9999".to_string()),
            ..Default::default()
        });
        let after = engine.server_config();
        assert_eq!(after.max_body_bytes, before);
        assert_eq!(after.port, ":9999");
    }

    #[test]
    fn test_rate_limit_rejects_zero() {
        let engine = Engine::new();
        engine.set_rate_limit(RateLimitConfig {
            max_requests: 0,
            window_secs: 10,
        });
        assert_eq!(engine.rate_limit(), RateLimitConfig::default());
    }

    #[test]
    fn test_dependencies() {
        let engine = Engine::new();
        engine.register_dependency("db", "postgres://localhost");
        assert_eq!(engine.dependency("db").as_deref(), Some("postgres://localhost"));
        assert_eq!(engine.dependency("cache"), None);
    }

    #[test]
    fn test_from_config() {
        let config: EngineConfig = toml::from_str(
            r#"
            [observability]
            include_debug_data = true
            log_level = "warn"

            [[routes]]
            path = "/items/{id}"
            method = "delete"
            message = "Deleted {id}"
            dependencies = ["db"]

            [routes.responses]
            "204" = "Deleted"

            [[routes]]
            path = "/bad"
            method = "NOT A METHOD"
            message = "x"

            [[middleware]]
            name = "cors"

            [[middleware]]
            name = "logging"
            enabled = false

            [dependencies]
            db = "sqlite::memory:"
            "#,
        )
        .unwrap();

        let engine = Engine::from_config(&config);
        assert!(engine.include_debug_data());
        assert_eq!(engine.log_level(), LogLevel::Warn);
        assert_eq!(engine.registry().len(), 1);
        assert_eq!(engine.middleware(), vec![MiddlewareKind::Cors]);
        assert_eq!(engine.dependency("db").as_deref(), Some("sqlite::memory:"));

        let found = engine.registry().find("/items/3", &Method::DELETE).unwrap();
        assert_eq!(found.route.responses[&204], "Deleted");
        assert_eq!(found.route.dependencies, vec!["db".to_string()]);
    }
}
