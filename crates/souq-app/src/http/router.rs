//! Explicit route table with `:param` path segments

use std::collections::HashMap;

use souq_types::Result;

use super::request::{ApiRequest, Method};
use super::response::ApiResponse;

/// Endpoint function over shared state `S`
pub type Handler<S> = fn(&S, &ApiRequest) -> Result<ApiResponse>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub struct Route<S> {
    pub method: Method,
    pub pattern: String,
    pub public: bool,
    pub handler: Handler<S>,
    segments: Vec<Segment>,
}

impl<S> Route<S> {
    fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), super::request::percent_decode(part));
                }
            }
        }
        Some(params)
    }
}

/// Outcome of resolving a method and path
pub enum Resolved<'a, S> {
    Found {
        route: &'a Route<S>,
        params: HashMap<String, String>,
    },
    /// The path exists under other methods
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

pub struct Router<S> {
    routes: Vec<Route<S>>,
}

impl<S> Default for Router<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Router<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add a route that requires an authenticated caller
    pub fn route(self, method: Method, pattern: &str, handler: Handler<S>) -> Self {
        self.add(method, pattern, handler, false)
    }

    /// Add a route open to anonymous callers
    pub fn public(self, method: Method, pattern: &str, handler: Handler<S>) -> Self {
        self.add(method, pattern, handler, true)
    }

    fn add(mut self, method: Method, pattern: &str, handler: Handler<S>, public: bool) -> Self {
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            public,
            handler,
            segments: parse_pattern(pattern),
        });
        self
    }

    pub fn routes(&self) -> &[Route<S>] {
        &self.routes
    }

    /// First matching route wins; literal routes should be added before
    /// overlapping parameter routes.
    pub fn resolve(&self, method: Method, path: &str) -> Resolved<'_, S> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            if let Some(params) = route.captures(path) {
                if route.method == method {
                    return Resolved::Found { route, params };
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method);
                }
            }
        }
        if allowed.is_empty() {
            Resolved::NotFound
        } else {
            Resolved::MethodNotAllowed(allowed)
        }
    }
}
