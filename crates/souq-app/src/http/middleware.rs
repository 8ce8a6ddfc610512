//! Ordered middleware pipeline in front of the route table

use std::time::Instant;

use super::request::ApiRequest;
use super::response::{ApiResponse, STATUS_INTERNAL};
use super::router::{Resolved, Router};

/// A step that may inspect or short-circuit a request
pub trait Middleware: Send + Sync {
    fn handle(&self, req: ApiRequest, next: Next<'_>) -> ApiResponse;
}

/// The remainder of the pipeline after the current middleware
pub struct Next<'a> {
    rest: &'a [Box<dyn Middleware>],
    endpoint: &'a dyn Fn(ApiRequest) -> ApiResponse,
}

impl<'a> Next<'a> {
    pub fn run(self, req: ApiRequest) -> ApiResponse {
        match self.rest.split_first() {
            Some((first, rest)) => first.handle(
                req,
                Next {
                    rest,
                    endpoint: self.endpoint,
                },
            ),
            None => (self.endpoint)(req),
        }
    }
}

/// Logs method, path, status and latency of every request
pub struct RequestLog;

impl Middleware for RequestLog {
    fn handle(&self, req: ApiRequest, next: Next<'_>) -> ApiResponse {
        let started = Instant::now();
        let method = req.method;
        let path = req.path.clone();
        let response = next.run(req);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if response.status >= STATUS_INTERNAL {
            tracing::error!(%method, %path, status = response.status, elapsed_ms, "request");
        } else {
            tracing::info!(%method, %path, status = response.status, elapsed_ms, "request");
        }
        response
    }
}

/// Route table plus the middleware that wraps every dispatch
pub struct Pipeline<S> {
    router: Router<S>,
    middleware: Vec<Box<dyn Middleware>>,
}

impl<S> Pipeline<S> {
    pub fn new(router: Router<S>) -> Self {
        Self {
            router,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware; earlier ones run first
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    /// Resolve the route, then run the middleware chain and the handler
    pub fn dispatch(&self, state: &S, mut req: ApiRequest) -> ApiResponse {
        let resolved = self.router.resolve(req.method, &req.path);
        if let Resolved::Found { route, params } = &resolved {
            req.params = params.clone();
            req.requires_auth = !route.public;
        }

        let endpoint = |req: ApiRequest| match &resolved {
            Resolved::Found { route, .. } => {
                (route.handler)(state, &req).unwrap_or_else(|e| ApiResponse::from_error(&e))
            }
            Resolved::MethodNotAllowed(allowed) => {
                ApiResponse::method_not_allowed(req.method, allowed)
            }
            Resolved::NotFound => ApiResponse::not_found(&req.path),
        };

        Next {
            rest: &self.middleware,
            endpoint: &endpoint,
        }
        .run(req)
    }
}
