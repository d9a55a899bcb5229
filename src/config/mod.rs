//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated)
//!     → Engine::from_config registers routes, middleware, dependencies
//!
//! At runtime:
//!     Engine::set_server_config(ServerConfigUpdate)
//!     → only positive fields replace the current ServerConfig
//!     → takes effect the next time the server starts
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    EngineConfig, MiddlewareConfig, ObservabilityConfig, RateLimitConfig, RouteConfig,
    ServerConfig, ServerConfigUpdate,
};
pub use validation::{validate_config, ValidationError};
