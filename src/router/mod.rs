//! Prefix routing.
//!
//! Routes are kept in registration order. A route matches when its method
//! equals the request method and the request path starts with its prefix.
//! When several routes match, the one registered **last** wins, so a more
//! specific prefix has to be added after the general one it overrides:
//!
//! ```text
//! GET /foo      → A
//! GET /foo/bar  → B
//!
//! GET /foo/baz  → A
//! GET /foo/bar  → B   (A matches too, B is later)
//! ```
//!
//! Requests nothing matches go to the fallback, which answers 404 with a
//! JSON echo of the request.

pub mod handler;

use std::sync::Arc;

use tracing::debug;

use crate::http::request::{Method, Request};
use crate::http::response::Response;

pub use handler::{BoxFuture, BoxedHandler, Handler};

/// Mutates a response after its handler returns, before it is written.
pub type PostProcess = Box<dyn Fn(&mut Response) + Send + Sync + 'static>;

/// One routing rule.
pub struct Route {
    pub method: Method,
    pub path_prefix: String,
    handler: BoxedHandler,
}

impl Route {
    pub fn new(method: Method, path_prefix: impl Into<String>, handler: impl Handler) -> Self {
        Self {
            method,
            path_prefix: path_prefix.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        self.method == request.method && request.path.starts_with(&self.path_prefix)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path_prefix)
    }
}

/// Route table plus fallback and response post-processors.
///
/// Built once before the server starts and shared read-only afterwards.
pub struct Router {
    routes: Vec<Route>,
    fallback: BoxedHandler,
    postprocesses: Vec<PostProcess>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: Arc::new(not_found),
            postprocesses: Vec::new(),
        }
    }

    pub fn add_route(&mut self, route: Route) -> &mut Self {
        debug!(method = %route.method, prefix = %route.path_prefix, "Added route");
        self.routes.push(route);
        self
    }

    pub fn get(&mut self, path_prefix: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.add_route(Route::new(Method::GET, path_prefix, handler))
    }

    pub fn post(&mut self, path_prefix: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.add_route(Route::new(Method::POST, path_prefix, handler))
    }

    /// Replaces the handler used when no route matches.
    pub fn set_fallback(&mut self, handler: impl Handler) -> &mut Self {
        self.fallback = Arc::new(handler);
        self
    }

    /// Appends a post-processor; they run in registration order.
    pub fn add_postprocess<F>(&mut self, postprocess: F) -> &mut Self
    where
        F: Fn(&mut Response) + Send + Sync + 'static,
    {
        self.postprocesses.push(Box::new(postprocess));
        self
    }

    /// Stamps every response with `Connection: keep-alive` or `Connection: close`.
    pub fn keep_alive(&mut self, flag: bool) -> &mut Self {
        self.add_postprocess(move |response| response.set_keep_alive(flag))
    }

    /// Selects the handler for `request`. Last matching route wins.
    pub fn select(&self, request: &Request) -> &BoxedHandler {
        self.routes
            .iter()
            .rev()
            .find(|route| route.matches(request))
            .map(|route| &route.handler)
            .unwrap_or(&self.fallback)
    }

    /// Runs the selected handler, then every post-processor.
    pub async fn dispatch(&self, request: Request) -> anyhow::Result<Response> {
        let mut response = self.select(&request).call(request).await?;
        self.apply_postprocess(&mut response);
        Ok(response)
    }

    pub fn apply_postprocess(&self, response: &mut Response) {
        for postprocess in &self.postprocesses {
            postprocess(response);
        }
    }
}

async fn not_found(request: Request) -> anyhow::Result<Response> {
    Ok(Response::not_found_json(&request.to_json())?)
}
