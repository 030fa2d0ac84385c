//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of many different types in one list.
//! Every `async fn` has its own anonymous future type, and every handler has
//! its own argument list, so handlers are erased behind [`ErasedHandler`]:
//! arguments are bound from the request *before* the handler runs, and the
//! returned future is boxed.
//!
//! # Argument binding
//!
//! Each handler argument is a type implementing
//! [`FromRequest`](crate::extract::FromRequest). Arguments are bound left to
//! right; the first one that fails short-circuits with its
//! [`Rejection`](crate::extract::Rejection), a `400 Bad Request`.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::extract::FromRequest;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn`
/// taking up to eight extractor arguments:
///
/// ```text
/// async fn name(a: A, b: B, ...) -> impl IntoResponse
///     where A: FromRequest, B: FromRequest, ...
/// ```
///
/// `T` is the tuple of argument types; it only exists so the blanket impls
/// for different arities do not overlap.
///
/// The trait is **sealed**: only the blanket impls below can satisfy it.
pub trait Handler<T>: private::Sealed<T> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed<T> {}
}

/// Holds a concrete handler `F` and implements [`ErasedHandler`], bridging
/// the typed world to the trait-object world.
struct FnHandler<F, T> {
    f: F,
    _args: PhantomData<fn() -> T>,
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, Fut, R, $($arg,)*> private::Sealed<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoResponse + Send + 'static,
            $($arg: FromRequest + Send + 'static,)*
        {
        }

        impl<F, Fut, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoResponse + Send + 'static,
            $($arg: FromRequest + Send + 'static,)*
        {
            fn into_boxed_handler(self) -> BoxedHandler {
                Arc::new(FnHandler { f: self, _args: PhantomData })
            }
        }

        impl<F, Fut, R, $($arg,)*> ErasedHandler for FnHandler<F, ($($arg,)*)>
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoResponse + Send + 'static,
            $($arg: FromRequest + Send + 'static,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, req: Request) -> BoxFuture {
                $(
                    let $arg = match <$arg as FromRequest>::from_request(&req) {
                        Ok(value) => value,
                        Err(rejection) => {
                            debug!(path = req.path(), %rejection, "argument binding failed");
                            return Box::pin(async move { rejection.into_response() });
                        }
                    };
                )*
                let fut = (self.f)($($arg),*);
                Box::pin(async move { fut.await.into_response() })
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// A handler that always answers with a clone of the same response.
pub(crate) struct Fixed(pub(crate) Response);

impl ErasedHandler for Fixed {
    fn call(&self, _req: Request) -> BoxFuture {
        let res = self.0.clone();
        Box::pin(async move { res })
    }
}
