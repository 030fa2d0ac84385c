//! Middleware ordering across global, group and per-route layers.

use std::sync::Arc;

use capsule::middleware::{self, Middleware, Next};
use capsule::{BoxFuture, Method, Request, Response, Route, Router, Status};
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<String>>>;

/// Records `>name` on the way in and `<name` on the way out.
struct Record {
    log: Log,
    name: &'static str,
}

impl Middleware for Record {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let log = Arc::clone(&self.log);
        let name = self.name;
        Box::pin(async move {
            log.lock().push(format!(">{name}"));
            let res = next.run(req).await;
            log.lock().push(format!("<{name}"));
            res
        })
    }
}

fn record(log: &Log, name: &'static str) -> Record {
    Record { log: Arc::clone(log), name }
}

fn handler(log: &Log) -> impl Fn() -> std::future::Ready<&'static str> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move || {
        log.lock().push("handler".to_owned());
        std::future::ready("ok")
    }
}

#[tokio::test]
async fn global_group_and_route_layers_nest() {
    let log = Log::default();
    let router = Router::new()
        .layer(record(&log, "global1"))
        .layer(record(&log, "global2"))
        .group("/admin", |g| {
            g.layer(record(&log, "group"))
                .route(Route::get("/", handler(&log)).layer(record(&log, "route")))
        });

    let res = router.handle(Request::new(Method::Get, "/admin")).await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(
        *log.lock(),
        [">global1", ">global2", ">group", ">route", "handler", "<route", "<group", "<global2", "<global1"]
    );
}

#[tokio::test]
async fn route_layers_stay_on_their_route() {
    let log = Log::default();
    let router = Router::new()
        .route(Route::get("/a", handler(&log)).layer(record(&log, "a-only")))
        .get("/b", handler(&log));

    router.handle(Request::new(Method::Get, "/b")).await;
    assert_eq!(*log.lock(), ["handler"]);
}

#[tokio::test]
async fn short_circuit_skips_the_rest() {
    let log = Log::default();
    let router = Router::new()
        .layer(record(&log, "outer"))
        .layer(middleware::from_fn(|req: Request, next: Next| async move {
            if req.header("authorization").is_none() {
                return Response::status(Status::Unauthorized);
            }
            next.run(req).await
        }))
        .layer(record(&log, "inner"))
        .get("/", handler(&log));

    let res = router.handle(Request::new(Method::Get, "/")).await;
    assert_eq!(res.status_code(), Status::Unauthorized);
    assert_eq!(*log.lock(), [">outer", "<outer"]);

    log.lock().clear();
    let res = router.handle(Request::new(Method::Get, "/").with_header("Authorization", "Bearer x")).await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(*log.lock(), [">outer", ">inner", "handler", "<inner", "<outer"]);
}

#[tokio::test]
async fn global_layers_see_404_and_405() {
    let router = Router::new()
        .layer(middleware::from_fn(|req: Request, next: Next| async move {
            next.run(req).await.with_header("x-served-by", "capsule")
        }))
        .post("/contact", || async { "sent" });

    let res = router.handle(Request::new(Method::Get, "/nowhere")).await;
    assert_eq!(res.status_code(), Status::NotFound);
    assert_eq!(res.header("x-served-by"), Some("capsule"));

    let res = router.handle(Request::new(Method::Get, "/contact")).await;
    assert_eq!(res.status_code(), Status::MethodNotAllowed);
    assert_eq!(res.header("allow"), Some("POST"));
    assert_eq!(res.header("x-served-by"), Some("capsule"));
}

#[tokio::test]
async fn middleware_can_rewrite_the_response() {
    let router = Router::new()
        .layer(middleware::from_fn(|req: Request, next: Next| async move {
            let res = next.run(req).await;
            if res.status_code() == Status::NotFound {
                return Response::builder().status(Status::NotFound).html("<h1>Kollet</h1>");
            }
            res
        }))
        .get("/", || async { "home" });

    let res = router.handle(Request::new(Method::Get, "/lost")).await;
    assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
    assert_eq!(res.body(), b"<h1>Kollet</h1>");
}
