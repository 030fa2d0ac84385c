//! Handler argument binding.
//!
//! Every handler argument implements [`FromRequest`]. The framework binds
//! the arguments from the incoming request before calling the handler:
//!
//! | Argument          | Bound from                                          |
//! |-------------------|-----------------------------------------------------|
//! | [`Request`]       | the request itself                                  |
//! | [`Params<T>`]     | route variables, by name, coerced to `T`'s fields   |
//! | [`Query<T>`]      | the query string                                    |
//! | [`Form<T>`]       | an `application/x-www-form-urlencoded` body         |
//! | [`Inject<T>`]     | the router's [`Container`](crate::Container)        |
//! | [`Extension<T>`]  | a value a middleware stored on the request          |
//! | `Option<E>`       | `E`, or `None` when `E` cannot be bound             |
//!
//! ```rust,no_run
//! use capsule::extract::{Inject, Params};
//! use capsule::{Response, Router};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ArticlePath { id: u64 }
//!
//! struct Greeter;
//!
//! async fn show(Params(path): Params<ArticlePath>, Inject(greeter): Inject<Greeter>) -> Response {
//!     Response::text(format!("article {}", path.id))
//! }
//!
//! Router::new().get("/articles/{id}", show);
//! ```
//!
//! A failed binding answers `400 Bad Request` with the reason as body.

use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::de::from_pairs;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// Types that can be bound as a handler argument.
pub trait FromRequest: Sized {
    fn from_request(req: &Request) -> Result<Self, Rejection>;
}

/// Why an argument could not be bound. Answers `400 Bad Request`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    message: String,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str { &self.message }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        Response::builder().status(Status::BadRequest).text(self.message)
    }
}

impl FromRequest for Request {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        Ok(req.clone())
    }
}

impl<T: FromRequest> FromRequest for Option<T> {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        Ok(T::from_request(req).ok())
    }
}

/// Route variables bound by name into `T`.
///
/// Tuples bind positionally, and a single scalar binds when the route has
/// exactly one placeholder.
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<T: DeserializeOwned> FromRequest for Params<T> {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        from_pairs(req.params())
            .map(Params)
            .map_err(|e| Rejection::new(format!("invalid route parameter: {e}")))
    }
}

/// Query-string pairs bound into `T`.
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

impl<T: DeserializeOwned> FromRequest for Query<T> {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        from_pairs(&req.query_pairs())
            .map(Query)
            .map_err(|e| Rejection::new(format!("invalid query string: {e}")))
    }
}

/// Urlencoded body pairs bound into `T`.
#[derive(Debug, Clone)]
pub struct Form<T>(pub T);

impl<T: DeserializeOwned> FromRequest for Form<T> {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        from_pairs(&req.form())
            .map(Form)
            .map_err(|e| Rejection::new(format!("invalid form: {e}")))
    }
}

/// A singleton service resolved out of the router's container.
pub struct Inject<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized + Send + Sync + 'static> FromRequest for Inject<T> {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        req.container()
            .resolve::<T>()
            .map(Inject)
            .map_err(|e| Rejection::new(e.to_string()))
    }
}

impl<T: ?Sized> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &T { &self.0 }
}

/// A clone of a value a middleware stored with
/// [`Request::insert_extension`].
#[derive(Debug, Clone)]
pub struct Extension<T>(pub T);

impl<T: Clone + Send + Sync + 'static> FromRequest for Extension<T> {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        req.extension::<T>()
            .cloned()
            .map(Extension)
            .ok_or_else(|| Rejection::new(format!("missing {}", std::any::type_name::<T>())))
    }
}
