//! Response template rendering.
//!
//! # Responsibilities
//! - Substitute `{name}` placeholders with path parameter values
//! - Walk JSON object templates recursively (nested objects and arrays)
//! - Fall back to literal substitution for non-JSON templates
//! - Decide whether the final text is a JSON document or needs the message envelope
//!
//! # Design Decisions
//! - Only keys present in the mapping are replaced; unknown placeholders stay verbatim
//! - Substitution is single-pass: inserted values are never re-scanned
//! - In JSON mode substitution happens on decoded strings and the serializer
//!   re-escapes, so values containing quotes or braces cannot break the document
//! - In plain mode values are inserted raw, which lets a non-JSON template become JSON

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Outcome of rendering a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// The rendered text is a JSON object and is returned as-is.
    Json(String),
    /// Plain text, to be wrapped in the `{"message": ...}` envelope.
    Text(String),
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

/// Replace every `{key}` whose key is in `params`.
pub fn substitute<'t>(text: &'t str, params: &BTreeMap<String, String>) -> Cow<'t, str> {
    if params.is_empty() || !text.contains('{') {
        return Cow::Borrowed(text);
    }
    placeholder_regex().replace_all(text, |caps: &Captures<'_>| match params.get(&caps[1]) {
        Some(value) => value.clone(),
        None => caps[0].to_string(),
    })
}

/// Substitute placeholders inside every string of a JSON value, in place.
pub fn substitute_json(value: &mut Value, params: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            let replaced = match substitute(s, params) {
                Cow::Owned(r) => Some(r),
                Cow::Borrowed(_) => None,
            };
            if let Some(r) = replaced {
                *s = r;
            }
        }
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| substitute_json(v, params)),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| substitute_json(v, params)),
        _ => {}
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Render a route's message template with its path parameters.
pub fn render(template: &str, params: &BTreeMap<String, String>) -> Rendered {
    let text = match parse_object(template) {
        Some(map) => {
            let mut value = Value::Object(map);
            substitute_json(&mut value, params);
            match serde_json::to_string(&value) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to re-encode JSON template, using literal substitution");
                    substitute(template, params).into_owned()
                }
            }
        }
        None => substitute(template, params).into_owned(),
    };

    if parse_object(&text).is_some() {
        Rendered::Json(text)
    } else {
        Rendered::Text(text)
    }
}
