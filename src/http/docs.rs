//! API documentation endpoints.
//!
//! # Responsibilities
//! - Synthesize an OpenAPI 3.0 document from the route registry
//! - Serve a Swagger UI page that loads its assets from a CDN
//!
//! # Design Decisions
//! - The document is rebuilt on every request; it reflects late registrations
//! - Placeholders without declared metadata are still documented as required
//!   string path parameters
//! - Dependency values are never exposed, only their names

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::routing::{ParamLocation, Route};

pub const OPENAPI_PATH: &str = "/openapi.json";
pub const SWAGGER_PATH: &str = "/swagger";

const API_TITLE: &str = "FastPaze API";
const API_VERSION: &str = "1.0.0";
const API_DESCRIPTION: &str = "High-performance API built with FastPaze";

/// Which documentation resource a request path refers to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocsResource {
    OpenApi,
    SwaggerUi,
}

impl DocsResource {
    pub fn for_path(path: &str) -> Option<Self> {
        match path {
            OPENAPI_PATH => Some(DocsResource::OpenApi),
            SWAGGER_PATH | "/swagger/" | "/swagger/index.html" => Some(DocsResource::SwaggerUi),
            _ => None,
        }
    }
}

/// Build the OpenAPI document for `routes`.
pub fn openapi_document(routes: &[Arc<Route>], dependency_names: &[String]) -> Value {
    let mut paths: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();

    for route in routes {
        paths
            .entry(route.path())
            .or_default()
            .insert(route.method().as_str().to_ascii_lowercase(), operation(route));
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": API_TITLE,
            "version": API_VERSION,
            "description": API_DESCRIPTION,
        },
        "paths": paths,
        "components": {
            "x-dependencies": dependency_names,
        },
    })
}

fn operation(route: &Route) -> Value {
    let mut op = Map::new();
    op.insert("summary".into(), Value::String(route.description.clone()));
    op.insert("parameters".into(), Value::Array(parameters(route)));

    if let Some(body) = &route.request_body {
        let schema = serde_json::from_str::<Value>(&body.schema)
            .unwrap_or_else(|_| json!({ "type": "object" }));
        let mut content = Map::new();
        content.insert(body.content_type.clone(), json!({ "schema": schema }));
        op.insert(
            "requestBody".into(),
            json!({
                "description": body.description,
                "required": body.required,
                "content": content,
            }),
        );
    }

    let mut responses = Map::new();
    for (status, description) in &route.responses {
        let entry = if *status == 200 {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "properties": {
                                "message": { "type": "string" },
                                "data": { "type": "object" },
                            },
                        },
                    },
                },
            })
        } else {
            json!({ "description": description })
        };
        responses.insert(status.to_string(), entry);
    }
    op.insert("responses".into(), Value::Object(responses));

    if !route.dependencies.is_empty() {
        op.insert("x-dependencies".into(), json!(route.dependencies));
    }

    Value::Object(op)
}

fn parameters(route: &Route) -> Vec<Value> {
    let mut params: Vec<Value> = route
        .parameters
        .iter()
        .map(|p| {
            let schema = p
                .schema
                .as_deref()
                .and_then(|s| serde_json::from_str::<Value>(s).ok())
                .unwrap_or_else(|| json!({ "type": p.type_name }));
            json!({
                "name": p.name,
                "in": p.location.to_string(),
                // OpenAPI requires path parameters to be marked required
                "required": p.required || p.location == ParamLocation::Path,
                "description": p.description,
                "schema": schema,
            })
        })
        .collect();

    for name in &route.param_names {
        let declared = route
            .parameters
            .iter()
            .any(|p| p.location == ParamLocation::Path && &p.name == name);
        if !declared {
            params.push(json!({
                "name": name,
                "in": "path",
                "required": true,
                "description": "",
                "schema": { "type": "string" },
            }));
        }
    }

    params
}

/// Swagger UI page pointed at the OpenAPI document.
pub fn swagger_page() -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{API_TITLE} - Swagger UI</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{OPENAPI_PATH}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##
    )
}
