//! Route matching, 404/405 handling, groups and reverse routing, driven
//! through `Router::handle`.

use capsule::extract::Params;
use capsule::{Error, Method, Request, Response, Route, Router, Status};
use serde::Deserialize;

fn text(res: &Response) -> String {
    String::from_utf8(res.body().to_vec()).unwrap()
}

async fn get(router: &Router, target: &str) -> Response {
    router.handle(Request::new(Method::Get, target)).await
}

#[derive(Deserialize)]
struct Id {
    id: u64,
}

async fn show(Params(p): Params<Id>) -> String {
    format!("item {}", p.id)
}

async fn list() -> &'static str {
    "list"
}

async fn create() -> (Status, &'static str) {
    (Status::Created, "created")
}

#[tokio::test]
async fn unmatched_path_is_404() {
    let router = Router::new().get("/items", list);
    let res = get(&router, "/nothing").await;
    assert_eq!(res.status_code(), Status::NotFound);
    assert_eq!(text(&res), "Not Found");
}

#[tokio::test]
async fn fallback_replaces_default_404() {
    let router = Router::new()
        .get("/items", list)
        .fallback(|req: Request| async move { (Status::NotFound, format!("no page at {}", req.path())) });
    let res = get(&router, "/missing").await;
    assert_eq!(res.status_code(), Status::NotFound);
    assert_eq!(text(&res), "no page at /missing");
}

#[tokio::test]
async fn wrong_method_is_405_with_allow() {
    let router = Router::new()
        .get("/items", list)
        .post("/items", create)
        .delete("/items/{id}", show);

    let res = router.handle(Request::new(Method::Put, "/items")).await;
    assert_eq!(res.status_code(), Status::MethodNotAllowed);
    assert_eq!(res.header("allow"), Some("GET, HEAD, POST"));
    assert_eq!(text(&res), "Method Not Allowed");
    assert_eq!(router.allowed_methods("/items/3"), [Method::Delete]);

    // The fallback only covers unknown paths.
    let router = router.fallback(|| async { "fallback" });
    let res = router.handle(Request::new(Method::Patch, "/items/3")).await;
    assert_eq!(res.status_code(), Status::MethodNotAllowed);
    assert_eq!(res.header("allow"), Some("DELETE"));
}

#[tokio::test]
async fn head_uses_get_route_without_body() {
    let router = Router::new().get("/items", list);
    let res = router.handle(Request::new(Method::Head, "/items")).await;
    assert_eq!(res.status_code(), Status::Ok);
    assert!(res.body().is_empty());
    assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
}

#[tokio::test]
async fn explicit_head_route_wins() {
    let router = Router::new()
        .get("/ping", || async { "pong" })
        .on(Method::Head, "/ping", || async { Response::status(Status::NoContent) });
    let res = router.handle(Request::new(Method::Head, "/ping")).await;
    assert_eq!(res.status_code(), Status::NoContent);
}

#[tokio::test]
async fn first_registered_route_wins() {
    let router = Router::new()
        .get("/items/{id}", show)
        .get("/items/{name}", || async { "by name" });
    assert_eq!(text(&get(&router, "/items/7").await), "item 7");
    assert_eq!(text(&get(&router, "/items/seven").await), "by name");
}

#[tokio::test]
async fn placeholder_conventions() {
    let router = Router::new()
        .get("/articles/{id}", show)
        .get("/tags/{slug}", |req: Request| async move { req.param("slug").unwrap_or_default().to_owned() })
        .get("/files/{uuid}", || async { "file" });

    assert_eq!(get(&router, "/articles/12").await.status_code(), Status::Ok);
    assert_eq!(get(&router, "/articles/12a").await.status_code(), Status::NotFound);
    assert_eq!(text(&get(&router, "/tags/fest-noz-2025").await), "fest-noz-2025");
    assert_eq!(get(&router, "/tags/Fest_Noz").await.status_code(), Status::NotFound);
    assert_eq!(get(&router, "/files/123e4567-e89b-12d3-a456-426614174000").await.status_code(), Status::Ok);
    assert_eq!(get(&router, "/files/123e4567").await.status_code(), Status::NotFound);
}

#[tokio::test]
async fn static_segments_are_literal() {
    let router = Router::new().get("/feed.xml", || async { "feed" });
    assert_eq!(get(&router, "/feed.xml").await.status_code(), Status::Ok);
    assert_eq!(get(&router, "/feedaxml").await.status_code(), Status::NotFound);
}

#[tokio::test]
async fn groups_prefix_their_routes() {
    let router = Router::new().group("/admin", |g| {
        g.get("/", || async { "dashboard" })
            .get("/users", || async { "users" })
            .group("/reports", |r| r.get("/{id}", show))
    });
    assert_eq!(text(&get(&router, "/admin").await), "dashboard");
    assert_eq!(text(&get(&router, "/admin/users").await), "users");
    assert_eq!(text(&get(&router, "/admin/reports/4").await), "item 4");
    assert_eq!(get(&router, "/users").await.status_code(), Status::NotFound);
    assert_eq!(router.len(), 3);
}

#[test]
fn url_for_builds_named_routes() {
    let router = Router::new()
        .route(Route::get("/articles/{id}", show).name("article"))
        .route(Route::get("/tags/{slug}", list).name("tag"));

    assert_eq!(router.url_for("article", &[("id", "42")]).unwrap(), "/articles/42");
    assert_eq!(router.url_for("tag", &[("slug", "kan-ha-diskan")]).unwrap(), "/tags/kan-ha-diskan");
    assert!(matches!(router.url_for("nope", &[]), Err(Error::UnknownRoute(_))));
    assert!(matches!(router.url_for("article", &[]), Err(Error::UrlGeneration { .. })));
    assert!(matches!(router.url_for("article", &[("id", "x")]), Err(Error::UrlGeneration { .. })));
}

#[test]
fn try_route_reports_bad_tables() {
    let err = Router::new().try_route(Route::get("/a/{id", list)).err().unwrap();
    assert!(matches!(err, Error::InvalidRoute { .. }));

    let err = Router::new()
        .route(Route::get("/a", list).name("home"))
        .try_route(Route::get("/b", list).name("home"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::DuplicateRouteName(name) if name == "home"));
}

#[test]
#[should_panic(expected = "appears twice")]
fn route_panics_on_invalid_pattern() {
    let _ = Router::new().get("/a/{id}/{id}", list);
}
