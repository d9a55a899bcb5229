//! Parameter resolution.
//!
//! Merges path, query and header values into a single mapping.
//! Order of precedence: path first, query overwrites on collision, headers are
//! namespaced under `header:<lower-case name>` so they never collide.

use std::collections::BTreeMap;

/// Prefix applied to header keys in [`ResolvedParameters`].
pub const HEADER_PREFIX: &str = "header:";

/// Per-request parameter mapping.
pub type ResolvedParameters = BTreeMap<String, String>;

/// Build the merged mapping for one request.
pub fn resolve<'a>(
    path_params: &'a [(String, String)],
    query: impl IntoIterator<Item = (&'a str, &'a str)>,
    headers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> ResolvedParameters {
    let mut params = path_param_map(path_params);
    for (k, v) in query {
        params.insert(k.to_string(), v.to_string());
    }
    for (k, v) in headers {
        params.insert(
            format!("{HEADER_PREFIX}{}", k.to_ascii_lowercase()),
            v.to_string(),
        );
    }
    params
}

/// Path parameters as a mapping; later duplicates win.
pub fn path_param_map(path_params: &[(String, String)]) -> ResolvedParameters {
    path_params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Decode a raw query string into ordered key/value pairs.
pub fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    })
    .unwrap_or_default()
}
