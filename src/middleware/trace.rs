//! Per-request tracing span with method, path, status and latency.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// Wraps every request in a `request` span and logs one line per response.
///
/// Register it first so it also covers 404 and 405 answers:
///
/// ```rust,no_run
/// use capsule::{Router, middleware::Trace};
/// let app = Router::new().layer(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        Box::pin(
            async move {
                let started = Instant::now();
                let res = next.run(req).await;
                info!(
                    status = res.status_code().code(),
                    latency_us = started.elapsed().as_micros() as u64,
                    "response"
                );
                res
            }
            .instrument(span),
        )
    }
}
