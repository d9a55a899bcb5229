//! FastPaze: a declarative HTTP routing engine.
//!
//! Routes are registered as (path pattern, method, response template) triples;
//! the engine matches requests, renders templates with path parameters and
//! serves the results behind a configurable middleware pipeline.

pub mod config;
pub mod dependencies;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod net;
pub mod observability;
pub mod routing;
pub mod template;

pub use config::{EngineConfig, ServerConfig, ServerConfigUpdate};
pub use engine::{Engine, RegistrationError};
pub use http::{DispatchRequest, DispatchResponse, Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{ParamLocation, ParameterMetadata, RequestBodyInfo, RouteOptions};
