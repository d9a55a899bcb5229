//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! DispatchRequest (method, path, query, headers, buffered body)
//!     → documentation paths bypass routing (docs.rs)
//!     → registry lookup on the normalized path
//!         miss → 404 envelope, with "Try using method X" when the path exists
//!     → JSON body parse (only for application/json)
//!         failure → 400 envelope, template not rendered
//!     → template render with path parameters
//!         JSON object → returned verbatim
//!         text        → {"message": ..., "data"?: ...}
//! ```
//!
//! # Design Decisions
//! - Transport-free: the dispatcher sees a fully buffered request and returns a
//!   value, so it is testable without sockets
//! - Every failure becomes an error envelope, never a transport error

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::dependencies::DependencyStore;
use crate::http::docs::{openapi_document, swagger_page, DocsResource};
use crate::http::response::{ApiResponse, ErrorResponse, JsonBody};
use crate::routing::{
    normalize_path, parse_query, path_param_map, resolve, ResolvedParameters, RouteRegistry,
};
use crate::template::{render, Rendered};

/// A fully buffered request.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Parse a raw query string (`a=1&b=2`).
    pub fn with_query(mut self, raw: &str) -> Self {
        self.query = parse_query(Some(raw));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

/// Outcome of dispatching one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResponse {
    Json(JsonBody),
    Html(String),
}

impl DispatchResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchResponse::Json(body) => body.status,
            DispatchResponse::Html(_) => StatusCode::OK,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            DispatchResponse::Json(body) => &body.body,
            DispatchResponse::Html(html) => html,
        }
    }
}

impl From<ErrorResponse> for DispatchResponse {
    fn from(error: ErrorResponse) -> Self {
        DispatchResponse::Json(error.into_body())
    }
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        match self {
            DispatchResponse::Json(body) => body.into_response(),
            DispatchResponse::Html(html) => {
                let mut response = (StatusCode::OK, html).into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
                response
            }
        }
    }
}

/// Terminal request handler.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<RouteRegistry>,
    dependencies: Arc<DependencyStore>,
    include_debug_data: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<RouteRegistry>,
        dependencies: Arc<DependencyStore>,
        include_debug_data: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            dependencies,
            include_debug_data,
        }
    }

    pub fn dispatch(&self, request: &DispatchRequest) -> DispatchResponse {
        if let Some(resource) = DocsResource::for_path(&request.path) {
            return self.docs(resource);
        }

        let path = normalize_path(&request.path);
        let Some(found) = self.registry.find(&path, &request.method) else {
            return self.not_found(&request.method, &path);
        };
        tracing::debug!(route = %found.route.key, "Route matched");

        let body = match parse_body(request) {
            Ok(body) => body,
            Err(error) => return error.into(),
        };

        let path_values = path_param_map(&found.path_params);
        match render(&found.route.message, &path_values) {
            Rendered::Json(text) => DispatchResponse::Json(JsonBody::ok(text)),
            Rendered::Text(text) => {
                let data = if self.include_debug_data.load(Ordering::Relaxed) {
                    let params = resolve(
                        &found.path_params,
                        request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                        request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                    );
                    debug_data(params, body)
                } else if path_values.is_empty() {
                    None
                } else {
                    Some(string_map(path_values))
                };
                DispatchResponse::Json(JsonBody::encode(&ApiResponse::new(text).with_data(data)))
            }
        }
    }

    fn docs(&self, resource: DocsResource) -> DispatchResponse {
        match resource {
            DocsResource::OpenApi => {
                let document = openapi_document(&self.registry.list(), &self.dependencies.names());
                DispatchResponse::Json(JsonBody::encode(&document))
            }
            DocsResource::SwaggerUi => DispatchResponse::Html(swagger_page()),
        }
    }

    fn not_found(&self, method: &Method, path: &str) -> DispatchResponse {
        tracing::warn!(method = %method, path = %path, "Route not found");

        let mut message = format!("Route not found for {method} {path}");
        let methods = self.registry.methods_for_path(path);
        if !methods.is_empty() {
            let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
            message.push_str(" - Try using method ");
            message.push_str(&names.join(" or "));
        }

        ErrorResponse::new(StatusCode::NOT_FOUND, message)
            .with_description("The requested endpoint does not exist")
            .into()
    }
}

fn parse_body(request: &DispatchRequest) -> Result<Option<Map<String, Value>>, ErrorResponse> {
    if request.body.is_empty() || !request.is_json() {
        return Ok(None);
    }

    let invalid = |description: String| {
        tracing::warn!(error = %description, "Failed to parse request body");
        ErrorResponse::new(StatusCode::BAD_REQUEST, "Invalid JSON body").with_description(description)
    };

    match serde_json::from_slice::<Value>(&request.body) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(invalid("request body must be a JSON object".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn debug_data(params: ResolvedParameters, body: Option<Map<String, Value>>) -> Option<Value> {
    let mut data = Map::new();
    if !params.is_empty() {
        data.insert("params".into(), string_map(params));
    }
    if let Some(body) = body {
        data.insert("body".into(), Value::Object(body));
    }
    (!data.is_empty()).then_some(Value::Object(data))
}

fn string_map(values: ResolvedParameters) -> Value {
    Value::Object(
        values
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Route, RouteOptions};

    fn dispatcher(routes: Vec<RouteOptions>) -> (Dispatcher, Arc<AtomicBool>) {
        let registry = Arc::new(RouteRegistry::new());
        for options in routes {
            registry.register(Route::build(options).0);
        }
        let debug = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher::new(registry, Arc::new(DependencyStore::new()), Arc::clone(&debug));
        (dispatcher, debug)
    }

    fn json(response: &DispatchResponse) -> Value {
        serde_json::from_str(response.body()).unwrap()
    }

    #[test]
    fn test_json_template_returned_verbatim() {
        let (d, _) = dispatcher(vec![RouteOptions::new(
            "/hello/{name}",
            Method::GET,
            r#"{"message":"Hello, {name}!"}"#,
        )]);
        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/hello/world"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), r#"{"message":"Hello, world!"}"#);
    }

    #[test]
    fn test_text_template_carries_path_params() {
        let (d, _) = dispatcher(vec![RouteOptions::new("/users/{id}", Method::GET, "User {id}")]);
        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/users/7"));
        assert_eq!(
            json(&response),
            serde_json::json!({"message": "User 7", "data": {"id": "7"}})
        );
    }

    #[test]
    fn test_static_text_route_has_no_data() {
        let (d, _) = dispatcher(vec![RouteOptions::new("/ping", Method::GET, "pong")]);
        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/ping/"));
        assert_eq!(response.body(), r#"{"message":"pong"}"#);
    }

    #[test]
    fn test_missing_route_without_hint() {
        let (d, _) = dispatcher(vec![RouteOptions::new("/hello/{name}", Method::GET, "hi")]);
        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json(&response);
        let error = body["error"].as_str().unwrap().to_lowercase();
        assert!(error.contains("not found"));
        assert!(!error.contains("try using method"));
        assert_eq!(body["status_code"], 404);
        assert_eq!(body["description"], "The requested endpoint does not exist");
    }

    #[test]
    fn test_wrong_method_hint() {
        let (d, _) = dispatcher(vec![
            RouteOptions::new("/hello/{name}", Method::GET, "hi"),
            RouteOptions::new("/hello/{name}", Method::PUT, "hi"),
        ]);
        let response = d.dispatch(&DispatchRequest::new(Method::POST, "/hello/world"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json(&response)["error"],
            "Route not found for POST /hello/world - Try using method GET or PUT"
        );
    }

    #[test]
    fn test_invalid_json_body_is_400() {
        let (d, _) = dispatcher(vec![RouteOptions::new("/items", Method::POST, r#"{"ok":true}"#)]);
        let request = DispatchRequest::new(Method::POST, "/items").with_body("application/json", "{oops");
        let response = d.dispatch(&request);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(&response);
        assert_eq!(body["error"], "Invalid JSON body");
        assert!(body["description"].is_string());

        let request = DispatchRequest::new(Method::POST, "/items").with_body("application/json", "[1,2]");
        assert_eq!(d.dispatch(&request).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_non_json_body_is_ignored() {
        let (d, _) = dispatcher(vec![RouteOptions::new("/items", Method::POST, "stored")]);
        let request = DispatchRequest::new(Method::POST, "/items").with_body("text/plain", "{oops");
        assert_eq!(d.dispatch(&request).status(), StatusCode::OK);
    }

    #[test]
    fn test_debug_data_includes_params_and_body() {
        let (d, debug) = dispatcher(vec![RouteOptions::new("/users/{id}", Method::POST, "saved")]);
        debug.store(true, Ordering::Relaxed);

        let request = DispatchRequest::new(Method::POST, "/users/3")
            .with_query("id=9&sort=asc")
            .with_header("X-Trace", "abc")
            .with_body("application/json; charset=utf-8", r#"{"name":"ada"}"#);
        let body = json(&d.dispatch(&request));

        // query overwrites path on collision
        assert_eq!(body["data"]["params"]["id"], "9");
        assert_eq!(body["data"]["params"]["sort"], "asc");
        assert_eq!(body["data"]["params"]["header:x-trace"], "abc");
        assert_eq!(body["data"]["body"]["name"], "ada");
        // the template still sees the path value
        assert_eq!(body["message"], "saved");
    }

    #[test]
    fn test_debug_data_absent_when_nothing_to_show() {
        let (d, debug) = dispatcher(vec![RouteOptions::new("/ping", Method::GET, "pong")]);
        debug.store(true, Ordering::Relaxed);
        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/ping"));
        assert_eq!(response.body(), r#"{"message":"pong"}"#);
    }

    #[test]
    fn test_docs_bypass_routing() {
        let (d, _) = dispatcher(vec![RouteOptions::new("/ping", Method::GET, "pong")]);

        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/openapi.json"));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json(&response)["paths"]["/ping"]["get"].is_object());

        let response = d.dispatch(&DispatchRequest::new(Method::GET, "/swagger/"));
        assert!(matches!(response, DispatchResponse::Html(_)));
    }
}
