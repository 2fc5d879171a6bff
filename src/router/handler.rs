//! The handler contract.
//!
//! Every handler is an async function from [`Request`] to
//! `anyhow::Result<Response>`. Plain synchronous logic is written as an
//! `async` block that never awaits, so there is a single call shape and no
//! runtime inspection of what kind of callback was registered.
//!
//! ```text
//! |req: Request| async move { ... }      ← user code
//!        ↓ Router::get("/hello", ...)
//! Arc<dyn Handler>                       ← stored in the route table
//!        ↓ handler.call(req)
//! Pin<Box<dyn Future<Output = Result<Response>>>>
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;

/// A heap-allocated future that can move between worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Produces exactly one response for a request, or fails.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<anyhow::Result<Response>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<anyhow::Result<Response>> {
        Box::pin((self)(req))
    }
}

/// A type-erased handler shared by every connection.
pub type BoxedHandler = Arc<dyn Handler>;
