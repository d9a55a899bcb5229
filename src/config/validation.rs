//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, caps > 0, port present)
//! - Check route methods and documented status codes
//! - Detect duplicate route identities
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Malformed path patterns are not errors here; registration logs and degrades them
//! - Unknown middleware names are not errors either; registration skips them

use std::collections::HashSet;

use crate::config::schema::EngineConfig;
use crate::observability::logging::LogLevel;
use crate::routing::{normalize_path, parse_method};

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("server.port must not be empty")]
    EmptyPort,

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("routes[{index}]: path must not be empty")]
    EmptyPath { index: usize },

    #[error("routes[{index}]: invalid method {method:?}")]
    InvalidMethod { index: usize, method: String },

    #[error("routes[{index}]: invalid response status {status:?}")]
    InvalidStatus { index: usize, status: String },

    #[error("routes[{index}]: duplicate route {route}")]
    DuplicateRoute { index: usize, route: String },
}

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server = &config.server;
    let positives: [(&'static str, u64); 5] = [
        ("server.read_timeout_ms", server.read_timeout_ms),
        ("server.write_timeout_ms", server.write_timeout_ms),
        ("server.idle_timeout_ms", server.idle_timeout_ms),
        ("server.max_body_bytes", server.max_body_bytes as u64),
        ("server.concurrency", server.concurrency as u64),
    ];
    for (field, value) in positives {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }
    if server.port.trim().is_empty() {
        errors.push(ValidationError::EmptyPort);
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::NotPositive {
            field: "rate_limit.max_requests",
        });
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::NotPositive {
            field: "rate_limit.window_secs",
        });
    }

    if config.observability.log_level.parse::<LogLevel>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.path.trim().is_empty() {
            errors.push(ValidationError::EmptyPath { index });
        }

        match parse_method(&route.method) {
            Some(method) => {
                let identity = format!("{} {}", method, normalize_path(&route.path));
                if !seen.insert(identity.clone()) {
                    errors.push(ValidationError::DuplicateRoute {
                        index,
                        route: identity,
                    });
                }
            }
            None => errors.push(ValidationError::InvalidMethod {
                index,
                method: route.method.clone(),
            }),
        }

        for status in route.responses.keys() {
            let valid = status
                .parse::<u16>()
                .map(|code| (100..=599).contains(&code))
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::InvalidStatus {
                    index,
                    status: status.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(path: &str, method: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            method: method.to_string(),
            message: "ok".to_string(),
            description: String::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: Default::default(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = EngineConfig::default();
        config.server.read_timeout_ms = 0;
        config.rate_limit.window_secs = 0;
        config.observability.log_level = "verbose".to_string();
        config.routes.push(route("/a", "FE TCH"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidLogLevel("verbose".to_string())));
        assert!(errors.contains(&ValidationError::InvalidMethod {
            index: 0,
            method: "FE TCH".to_string()
        }));
    }

    #[test]
    fn test_duplicate_route_after_normalization() {
        let mut config = EngineConfig::default();
        config.routes.push(route("/users/", "get"));
        config.routes.push(route("/users", "GET"));
        config.routes.push(route("/users", "POST"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateRoute {
                index: 1,
                route: "GET /users".to_string()
            }]
        );
    }

    #[test]
    fn test_invalid_status_key() {
        let mut config = EngineConfig::default();
        let mut r = route("/a", "GET");
        r.responses.insert("20x".to_string(), "nope".to_string());
        r.responses.insert("201".to_string(), "Created".to_string());
        config.routes.push(r);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
