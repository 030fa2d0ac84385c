//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, authentication, CSRF checks.
//!
//! A middleware receives the request and a [`Next`] handle to the rest of
//! the chain. It either delegates with `next.run(req).await` (and may touch
//! the response on the way back) or short-circuits by returning its own
//! response.
//!
//! Layers compose in registration order: for `[a, b, c]` the request flows
//! `a → b → c → handler` and the response flows back `c → b → a`. The last
//! registered layer sits closest to the handler.
//!
//! ```rust,no_run
//! use capsule::middleware::{self, Next};
//! use capsule::{Request, Response, Router, Status};
//!
//! let deny_bots = middleware::from_fn(|req: Request, next: Next| async move {
//!     if req.header("user-agent").is_some_and(|ua| ua.contains("bot")) {
//!         return Response::status(Status::Forbidden);
//!     }
//!     next.run(req).await
//! });
//!
//! let app = Router::new().layer(deny_bots);
//! ```

pub mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::IntoResponse;

pub use trace::Trace;

/// A request interceptor.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

/// The remainder of a middleware chain, ending at the handler.
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(chain: Arc<[Arc<dyn Middleware>]>, endpoint: BoxedHandler) -> Self {
        Self { chain, index: 0, endpoint }
    }

    /// Passes `req` to the next layer, or to the handler when none is left.
    pub fn run(self, req: Request) -> BoxFuture {
        match self.chain.get(self.index) {
            Some(layer) => {
                let layer = Arc::clone(layer);
                let next = Next { chain: self.chain, index: self.index + 1, endpoint: self.endpoint };
                layer.handle(req, next)
            }
            None => self.endpoint.call(req),
        }
    }
}

/// Adapts an async closure `(Request, Next) -> impl IntoResponse` into a
/// [`Middleware`].
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    FromFn(f)
}

/// Middleware built by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self.0)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}
