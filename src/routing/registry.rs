//! Route registry and lookup.
//!
//! # Responsibilities
//! - Store routes keyed by (path, method)
//! - Exact lookup first, pattern scan second
//! - Report which methods serve a path (for "try method X" hints)
//! - Provide read-only snapshots for documentation
//!
//! # Design Decisions
//! - Guarded by a `RwLock`: lookups share the read lock, registration takes the write lock
//! - Routes are stored as `Arc<Route>` and fully built before the write lock is taken
//! - Re-registration replaces the value but keeps the original registration position
//! - Among several matching patterns the most specific wins, ties go to the earliest registered

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::Method;

use crate::routing::route::{Route, RouteKey};

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Path parameters in declaration order (empty for exact matches).
    pub path_params: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct RouteTable {
    by_key: HashMap<RouteKey, Arc<Route>>,
    order: Vec<RouteKey>,
}

/// Concurrency-safe route store.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    table: RwLock<RouteTable>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a route. Returns true if an existing route was replaced.
    pub fn register(&self, route: Route) -> bool {
        let route = Arc::new(route);
        let key = route.key.clone();

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = table.by_key.insert(key.clone(), route).is_some();
        if !replaced {
            table.order.push(key.clone());
        }
        drop(table);

        if replaced {
            tracing::info!(route = %key, "Route replaced");
        } else {
            tracing::debug!(route = %key, "Route inserted");
        }
        replaced
    }

    /// Find the route serving `method path`.
    pub fn find(&self, path: &str, method: &Method) -> Option<RouteMatch> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);

        let key = RouteKey {
            path: path.to_string(),
            method: method.clone(),
        };
        if let Some(route) = table.by_key.get(&key) {
            return Some(RouteMatch {
                route: Arc::clone(route),
                path_params: Vec::new(),
            });
        }

        let mut best: Option<(&Arc<Route>, Vec<(String, String)>)> = None;
        for key in table.order.iter().filter(|k| &k.method == method) {
            let Some(route) = table.by_key.get(key) else {
                continue;
            };
            let Some(params) = route.match_path(path) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((current, _)) => specificity(route) > specificity(current),
            };
            if better {
                best = Some((route, params));
            }
        }

        best.map(|(route, path_params)| RouteMatch {
            route: Arc::clone(route),
            path_params,
        })
    }

    /// Methods registered for routes that accept `path`, sorted and deduplicated.
    pub fn methods_for_path(&self, path: &str) -> Vec<Method> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let mut methods: Vec<Method> = table
            .order
            .iter()
            .filter_map(|k| table.by_key.get(k))
            .filter(|r| r.accepts_path(path))
            .map(|r| r.method().clone())
            .collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        methods
    }

    /// Snapshot of all routes in registration order.
    pub fn list(&self) -> Vec<Arc<Route>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .order
            .iter()
            .filter_map(|k| table.by_key.get(k).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn specificity(route: &Route) -> (usize, usize) {
    route
        .pattern
        .as_ref()
        .map(|p| p.specificity())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::RouteOptions;
    use std::thread;

    fn route(path: &str, method: Method, message: &str) -> Route {
        Route::build(RouteOptions::new(path, method, message)).0
    }

    #[test]
    fn test_exact_lookup() {
        let registry = RouteRegistry::new();
        registry.register(route("/hello", Method::GET, "hi"));
        let m = registry.find("/hello", &Method::GET).unwrap();
        assert_eq!(m.route.message, "hi");
        assert!(m.path_params.is_empty());
        assert!(registry.find("/hello", &Method::POST).is_none());
    }

    #[test]
    fn test_pattern_lookup_extracts_params() {
        let registry = RouteRegistry::new();
        registry.register(route("/posts/{post}/comments/{comment}", Method::GET, "c"));
        let m = registry.find("/posts/1/comments/2", &Method::GET).unwrap();
        assert_eq!(
            m.path_params,
            vec![
                ("post".to_string(), "1".to_string()),
                ("comment".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_exact_match_preferred_over_pattern() {
        let registry = RouteRegistry::new();
        registry.register(route("/users/{id}", Method::GET, "dynamic"));
        registry.register(route("/users/me", Method::GET, "static"));
        let m = registry.find("/users/me", &Method::GET).unwrap();
        assert_eq!(m.route.message, "static");
        assert!(m.path_params.is_empty());
    }

    #[test]
    fn test_most_specific_pattern_wins() {
        let registry = RouteRegistry::new();
        registry.register(route("/{a}/{b}", Method::GET, "generic"));
        registry.register(route("/users/{id}", Method::GET, "users"));
        let m = registry.find("/users/5", &Method::GET).unwrap();
        assert_eq!(m.route.message, "users");
    }

    #[test]
    fn test_ties_go_to_first_registered() {
        let registry = RouteRegistry::new();
        registry.register(route("/items/{id}", Method::GET, "first"));
        registry.register(route("/items/{slug}", Method::GET, "second"));
        let m = registry.find("/items/x", &Method::GET).unwrap();
        assert_eq!(m.route.message, "first");
    }

    #[test]
    fn test_reregistration_overwrites() {
        let registry = RouteRegistry::new();
        assert!(!registry.register(route("/a", Method::GET, "one")));
        assert!(registry.register(route("/a", Method::GET, "two")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("/a", &Method::GET).unwrap().route.message, "two");
    }

    #[test]
    fn test_methods_for_path() {
        let registry = RouteRegistry::new();
        registry.register(route("/hello/{name}", Method::GET, "g"));
        registry.register(route("/hello/{name}", Method::PUT, "p"));
        registry.register(route("/other", Method::POST, "o"));
        assert_eq!(
            registry.methods_for_path("/hello/world"),
            vec![Method::GET, Method::PUT]
        );
        assert!(registry.methods_for_path("/missing").is_empty());
    }

    #[test]
    fn test_concurrent_register_and_find() {
        let registry = Arc::new(RouteRegistry::new());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for j in 0..50 {
                        registry.register(route(
                            &format!("/w{i}/{{id}}/{j}"),
                            Method::GET,
                            "x",
                        ));
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..50 {
                        if let Some(m) = registry.find("/w0/7/3", &Method::GET) {
                            assert_eq!(m.route.message, "x");
                            assert_eq!(m.path_params[0].1, "7");
                        }
                    }
                })
            })
            .collect();
        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}
