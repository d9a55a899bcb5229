//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     RouteOptions
//!     → route.rs (normalize path, compile pattern once)
//!     → registry.rs (insert or replace under (path, method))
//!
//! Lookup:
//!     (path, method)
//!     → exact key lookup
//!     → otherwise scan dynamic patterns with the same method
//!     → RouteMatch { route, path_params } or None
//!     → params.rs merges path, query and header values
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at registration, never per request
//! - Placeholders match exactly one non-empty segment
//! - Deterministic: most specific pattern wins, then registration order

pub mod params;
pub mod pattern;
pub mod registry;
pub mod route;

pub use params::{parse_query, path_param_map, resolve, ResolvedParameters, HEADER_PREFIX};
pub use pattern::{normalize_path, PathPattern, PatternError};
pub use registry::{RouteMatch, RouteRegistry};
pub use route::{
    default_responses, parse_method, ParamLocation, ParameterMetadata, RequestBodyInfo, Route,
    RouteKey, RouteOptions,
};
