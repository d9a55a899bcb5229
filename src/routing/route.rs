//! Route definitions.
//!
//! A [`Route`] is built once from [`RouteOptions`] and never mutated; updating
//! a route means registering a new value under the same identity.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::routing::pattern::{normalize_path, placeholder_names, PathPattern, PatternError};

/// Where a documented parameter lives in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        };
        f.write_str(s)
    }
}

/// Declarative description of one parameter, used for documentation only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParameterMetadata {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParamLocation,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    /// Primitive type name (`string`, `integer`, ...).
    #[serde(rename = "type", default = "default_param_type")]
    pub type_name: String,

    /// Optional JSON schema for complex types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

fn default_param_type() -> String {
    "string".to_string()
}

impl ParameterMetadata {
    pub fn new(name: impl Into<String>, location: ParamLocation) -> Self {
        Self {
            name: name.into(),
            location,
            description: String::new(),
            required: location == ParamLocation::Path,
            type_name: default_param_type(),
            schema: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}

/// Request body documentation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestBodyInfo {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// JSON schema or reference, passed through to the OpenAPI document.
    #[serde(default)]
    pub schema: String,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// Status codes documented for every route unless overridden.
pub fn default_responses() -> BTreeMap<u16, String> {
    BTreeMap::from([
        (200, "Successful response".to_string()),
        (400, "Bad request".to_string()),
        (404, "Not found".to_string()),
        (500, "Internal server error".to_string()),
    ])
}

/// Identity of a route: normalized path plus upper-case method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub path: String,
    pub method: Method,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Parse a method name case-insensitively into its upper-case form.
pub fn parse_method(method: &str) -> Option<Method> {
    let upper = method.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    Method::from_str(&upper).ok()
}

/// Everything a caller supplies when registering a route.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub path: String,
    pub method: Method,
    pub message: String,
    pub description: String,
    pub parameters: Vec<ParameterMetadata>,
    pub request_body: Option<RequestBodyInfo>,
    pub responses: BTreeMap<u16, String>,
    pub dependencies: Vec<String>,
}

impl RouteOptions {
    pub fn new(path: impl Into<String>, method: Method, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            message: message.into(),
            description: String::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: default_responses(),
            dependencies: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parameter(mut self, parameter: ParameterMetadata) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(mut self, parameters: Vec<ParameterMetadata>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn request_body(mut self, body: RequestBodyInfo) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Document an extra status code (merged over the defaults).
    pub fn response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.responses.insert(status, description.into());
        self
    }

    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub key: RouteKey,
    /// Response template, plain text or JSON.
    pub message: String,
    pub description: String,
    pub parameters: Vec<ParameterMetadata>,
    pub request_body: Option<RequestBodyInfo>,
    pub responses: BTreeMap<u16, String>,
    pub dependencies: Vec<String>,
    /// `None` when the declared path failed to compile; the route is then exact-match only.
    pub pattern: Option<PathPattern>,
    pub param_names: Vec<String>,
}

impl Route {
    /// Build a route, compiling its path pattern.
    ///
    /// Returns the route together with the compile error, if any. A route with a
    /// malformed pattern is still usable through exact lookup.
    pub fn build(options: RouteOptions) -> (Self, Option<PatternError>) {
        let path = normalize_path(&options.path);
        let (pattern, param_names, error) = match PathPattern::compile(&path) {
            Ok(p) => {
                let names = p.param_names().to_vec();
                (Some(p), names, None)
            }
            Err(e) => (None, placeholder_names(&path), Some(e)),
        };

        let route = Self {
            key: RouteKey {
                path,
                method: options.method,
            },
            message: options.message,
            description: options.description,
            parameters: options.parameters,
            request_body: options.request_body,
            responses: options.responses,
            dependencies: options.dependencies,
            pattern,
            param_names,
        };
        (route, error)
    }

    pub fn path(&self) -> &str {
        &self.key.path
    }

    pub fn method(&self) -> &Method {
        &self.key.method
    }

    /// Pattern match against a concrete path; `None` for static or uncompiled routes.
    pub fn match_path(&self, path: &str) -> Option<Vec<(String, String)>> {
        self.pattern
            .as_ref()
            .filter(|p| p.is_dynamic())
            .and_then(|p| p.captures(path))
    }

    /// True if the route would serve this path under some method.
    pub fn accepts_path(&self, path: &str) -> bool {
        self.key.path == path
            || self
                .pattern
                .as_ref()
                .is_some_and(|p| p.is_dynamic() && p.is_match(path))
    }
}
