//! Request router.
//!
//! Routes are kept in registration order and matched by a linear scan: the
//! first route whose path *and* method match wins. Paths are compiled once
//! at registration (see [`route`](crate::route)), so the scan only runs
//! anchored regular expressions.
//!
//! Dispatch rules:
//!
//! - no route matches the path → `404 Not Found` (or the fallback handler);
//! - some route matches the path but none allows the method →
//!   `405 Method Not Allowed` with an `Allow` header listing every method
//!   accepted on that path;
//! - `HEAD` is accepted wherever `GET` is. Without an explicit `HEAD` route
//!   the `GET` handler runs and the body is dropped.
//!
//! Global middleware ([`Router::layer`]) wraps the whole dispatch, 404 and
//! 405 answers included. Per-route middleware ([`Route::layer`]) wraps only
//! its own handler.

use std::sync::Arc;

use crate::container::Container;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Fixed, Handler};
use crate::method::Method;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::route::{self, CompiledPath, Route};
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every registration method returns `self` so registrations chain.
///
/// ```rust,no_run
/// # use capsule::{Request, Response, Route, Router, middleware::Trace};
/// # async fn home(_: Request) -> Response { Response::text("") }
/// # async fn article(_: Request) -> Response { Response::text("") }
/// # async fn dashboard(_: Request) -> Response { Response::text("") }
/// # async fn save(_: Request) -> Response { Response::text("") }
/// Router::new()
///     .layer(Trace)
///     .get("/", home)
///     .route(Route::get("/articles/{id}", article).name("article.show"))
///     .group("/admin", |admin| admin.get("/", dashboard).post("/articles", save));
/// ```
pub struct Router {
    routes: Vec<CompiledRoute>,
    middleware: Arc<[Arc<dyn Middleware>]>,
    container: Arc<Container>,
    fallback: Option<BoxedHandler>,
}

struct CompiledRoute {
    methods: Vec<Method>,
    path: CompiledPath,
    name: Option<String>,
    chain: Arc<[Arc<dyn Middleware>]>,
    handler: BoxedHandler,
}

enum Lookup<'a> {
    Found(&'a CompiledRoute, Vec<(String, String)>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middleware: Arc::new([]),
            container: Arc::new(Container::new()),
            fallback: None,
        }
    }

    /// Attaches the service container handlers resolve
    /// [`Inject`](crate::extract::Inject) arguments from.
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Arc::new(container);
        self
    }

    pub fn container(&self) -> &Container { &self.container }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax. See [`route`](crate::route) for
    /// the per-name matching conventions.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern.
    pub fn on<H: Handler<T>, T: 'static>(self, method: Method, path: &str, handler: H) -> Self {
        self.route(Route::new(&[method], path, handler))
    }

    pub fn get<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn patch<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Delete, path, handler)
    }

    /// Registers a fully described [`Route`].
    ///
    /// # Panics
    ///
    /// Panics on an invalid pattern or a duplicate route name. Routes are
    /// registered at startup, where a bad table is a programming error.
    pub fn route(self, route: Route) -> Self {
        self.try_route(route).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fallible form of [`Router::route`].
    pub fn try_route(mut self, route: Route) -> Result<Self, Error> {
        let path = route::compile(&route.pattern)?;
        if let Some(name) = &route.name {
            if self.routes.iter().any(|r| r.name.as_deref() == Some(name)) {
                return Err(Error::DuplicateRouteName(name.clone()));
            }
        }
        self.routes.push(CompiledRoute {
            methods: route.methods,
            path,
            name: route.name,
            chain: route.middleware.into(),
            handler: route.handler,
        });
        Ok(self)
    }

    /// Registers every route of a [`Group`] under `prefix`.
    pub fn group(mut self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        for route in build(Group::new()).into_routes(prefix) {
            self = self.route(route);
        }
        self
    }

    /// Adds a global middleware. Earlier layers wrap later ones.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut layers = self.middleware.to_vec();
        layers.push(Arc::new(middleware));
        self.middleware = layers.into();
        self
    }

    /// Handler answering requests no route path matches, instead of the
    /// plain `404 Not Found`.
    pub fn fallback<H: Handler<T>, T: 'static>(mut self, handler: H) -> Self {
        self.fallback = Some(handler.into_boxed_handler());
        self
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize { self.routes.len() }

    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    /// Builds the URL of the route called `name`.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, Error> {
        self.routes
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .ok_or_else(|| Error::UnknownRoute(name.to_owned()))?
            .path
            .build(params)
    }

    /// Methods accepted on `path`, in first-registration order. `HEAD` is
    /// listed right after `GET` when only `GET` was registered.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed = Vec::new();
        for route in self.routes.iter().filter(|r| r.path.is_match(path)) {
            for method in &route.methods {
                if !allowed.contains(method) {
                    allowed.push(*method);
                }
            }
        }
        with_implicit_head(allowed)
    }

    fn lookup(&self, method: Method, path: &str) -> Lookup<'_> {
        let mut path_matched = false;
        let mut head_fallback = None;

        for route in &self.routes {
            let Some(params) = route.path.captures(path) else {
                continue;
            };
            path_matched = true;
            if route.methods.contains(&method) {
                return Lookup::Found(route, params);
            }
            if method == Method::Head && head_fallback.is_none() && route.methods.contains(&Method::Get) {
                head_fallback = Some((route, params));
            }
        }

        match head_fallback {
            Some((route, params)) => Lookup::Found(route, params),
            None if path_matched => Lookup::MethodNotAllowed(self.allowed_methods(path)),
            None => Lookup::NotFound,
        }
    }

    /// Routes one request through the middleware and the matched handler.
    pub async fn handle(&self, mut req: Request) -> Response {
        req.container = Arc::clone(&self.container);
        let method = req.method;

        let endpoint: BoxedHandler = match self.lookup(method, &req.path) {
            Lookup::Found(route, params) => {
                req.params = params;
                Arc::new(RouteEndpoint {
                    chain: Arc::clone(&route.chain),
                    handler: Arc::clone(&route.handler),
                })
            }
            Lookup::MethodNotAllowed(allowed) => Arc::new(Fixed(method_not_allowed(&allowed))),
            Lookup::NotFound => match &self.fallback {
                Some(fallback) => Arc::clone(fallback),
                None => Arc::new(Fixed(Response::builder().status(Status::NotFound).text(Status::NotFound.reason()))),
            },
        };

        let mut res = Next::new(Arc::clone(&self.middleware), endpoint).run(req).await;
        if method == Method::Head {
            res.strip_body();
        }
        res
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// A matched route's own middleware chain ending at its handler.
struct RouteEndpoint {
    chain: Arc<[Arc<dyn Middleware>]>,
    handler: BoxedHandler,
}

impl ErasedHandler for RouteEndpoint {
    fn call(&self, req: Request) -> BoxFuture {
        Next::new(Arc::clone(&self.chain), Arc::clone(&self.handler)).run(req)
    }
}

fn with_implicit_head(mut methods: Vec<Method>) -> Vec<Method> {
    if !methods.contains(&Method::Head) {
        if let Some(get) = methods.iter().position(|m| *m == Method::Get) {
            methods.insert(get + 1, Method::Head);
        }
    }
    methods
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
    Response::builder()
        .status(Status::MethodNotAllowed)
        .header("allow", &allow)
        .text(Status::MethodNotAllowed.reason())
}

// ── Groups ────────────────────────────────────────────────────────────────────

/// Routes sharing a path prefix and middleware.
///
/// Group middleware wraps every route of the group, outside the routes' own
/// layers, whatever the order of registration inside the group.
pub struct Group {
    middleware: Vec<Arc<dyn Middleware>>,
    routes: Vec<Route>,
}

impl Group {
    fn new() -> Self {
        Self { middleware: Vec::new(), routes: Vec::new() }
    }

    pub fn on<H: Handler<T>, T: 'static>(self, method: Method, path: &str, handler: H) -> Self {
        self.route(Route::new(&[method], path, handler))
    }

    pub fn get<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn patch<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete<H: Handler<T>, T: 'static>(self, path: &str, handler: H) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// A nested group under `prefix`, relative to this group.
    pub fn group(mut self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        let nested = build(Group::new()).into_routes(prefix);
        self.routes.extend(nested);
        self
    }

    fn into_routes(self, prefix: &str) -> Vec<Route> {
        let Group { middleware, routes } = self;
        routes
            .into_iter()
            .map(|mut route| {
                route.pattern = join(prefix, &route.pattern);
                let mut layers = middleware.clone();
                layers.append(&mut route.middleware);
                route.middleware = layers;
                route
            })
            .collect()
    }
}

/// `join("/admin", "/")` is `/admin`, `join("/admin/", "users")` is `/admin/users`.
fn join(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match path.trim_start_matches('/') {
        "" if prefix.is_empty() => "/".to_owned(),
        "" => prefix.to_owned(),
        rest => format!("{prefix}/{rest}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_prefixes() {
        assert_eq!(join("/admin", "/"), "/admin");
        assert_eq!(join("/admin/", "users"), "/admin/users");
        assert_eq!(join("/admin", "/users/{id}"), "/admin/users/{id}");
        assert_eq!(join("", "/"), "/");
        assert_eq!(join("/", "/contact"), "/contact");
    }

    #[test]
    fn implicit_head_follows_get() {
        assert_eq!(
            with_implicit_head(vec![Method::Post, Method::Get, Method::Delete]),
            [Method::Post, Method::Get, Method::Head, Method::Delete]
        );
        assert_eq!(
            with_implicit_head(vec![Method::Head, Method::Get]),
            [Method::Head, Method::Get]
        );
        assert_eq!(with_implicit_head(vec![Method::Post]), [Method::Post]);
    }
}
