//! Handler argument binding: route parameters, query, form, container
//! services and middleware extensions.

use std::sync::Arc;

use capsule::extract::{Extension, Form, Inject, Params, Query};
use capsule::middleware::{self, Next};
use capsule::{Container, Method, Request, Response, Router, Status};
use serde::Deserialize;

fn text(res: &Response) -> String {
    String::from_utf8(res.body().to_vec()).unwrap()
}

#[derive(Deserialize)]
struct Page {
    page: u32,
}

#[tokio::test]
async fn params_are_coerced_or_rejected() {
    let router = Router::new()
        .get("/list/{page}", |Params(p): Params<Page>| async move { format!("page {}", p.page) });

    let res = router.handle(Request::new(Method::Get, "/list/3")).await;
    assert_eq!(text(&res), "page 3");

    let res = router.handle(Request::new(Method::Get, "/list/three")).await;
    assert_eq!(res.status_code(), Status::BadRequest);
    assert!(text(&res).contains("invalid route parameter"));
}

#[tokio::test]
async fn params_bind_positionally_into_tuples() {
    let router = Router::new().get(
        "/archive/{year}/{slug}",
        |Params((year, slug)): Params<(u16, String)>| async move { format!("{slug}@{year}") },
    );
    let res = router.handle(Request::new(Method::Get, "/archive/2025/gouel-broadel")).await;
    assert_eq!(text(&res), "gouel-broadel@2025");
}

#[derive(Deserialize)]
struct Search {
    q: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    exact: bool,
}

#[tokio::test]
async fn query_binds_with_optional_fields() {
    let router = Router::new().get("/search", |Query(s): Query<Search>| async move {
        format!("{} {:?} {}", s.q, s.page, s.exact)
    });

    let res = router.handle(Request::new(Method::Get, "/search?q=fest%20noz&exact=yes")).await;
    assert_eq!(text(&res), "fest noz None true");

    let res = router.handle(Request::new(Method::Get, "/search?q=x&page=2&exact=0")).await;
    assert_eq!(text(&res), "x Some(2) false");

    let res = router.handle(Request::new(Method::Get, "/search?page=2")).await;
    assert_eq!(res.status_code(), Status::BadRequest);
}

#[derive(Deserialize)]
struct Signup {
    email: String,
    age: u8,
}

#[tokio::test]
async fn form_binds_urlencoded_bodies_only() {
    let router = Router::new().post("/signup", |Form(f): Form<Signup>| async move {
        (Status::Created, format!("{} ({})", f.email, f.age))
    });

    let req = Request::new(Method::Post, "/signup").with_form(&[("email", "anna@ti.bzh"), ("age", "31")]);
    let res = router.handle(req).await;
    assert_eq!(res.status_code(), Status::Created);
    assert_eq!(text(&res), "anna@ti.bzh (31)");

    let req = Request::new(Method::Post, "/signup")
        .with_header("content-type", "application/json")
        .with_body(r#"{"email":"a","age":1}"#);
    assert_eq!(router.handle(req).await.status_code(), Status::BadRequest);
}

#[tokio::test]
async fn option_turns_rejection_into_none() {
    let router = Router::new().get("/maybe", |q: Option<Query<Page>>| async move {
        match q {
            Some(Query(p)) => format!("page {}", p.page),
            None => "no page".to_owned(),
        }
    });
    assert_eq!(text(&router.handle(Request::new(Method::Get, "/maybe?page=2")).await), "page 2");
    assert_eq!(text(&router.handle(Request::new(Method::Get, "/maybe?page=x")).await), "no page");
}

trait Clock: Send + Sync {
    fn year(&self) -> u16;
}

struct Fixed(u16);

impl Clock for Fixed {
    fn year(&self) -> u16 { self.0 }
}

struct Banner {
    text: String,
}

#[tokio::test]
async fn inject_resolves_container_services() {
    let mut container = Container::new();
    container
        .instance::<dyn Clock>(Arc::new(Fixed(2025)))
        .register::<Banner, _>(|c| {
            let clock = c.resolve::<dyn Clock>()?;
            Ok(Arc::new(Banner { text: format!("Gouel {}", clock.year()) }))
        });

    let router = Router::new()
        .with_container(container)
        .get("/banner", |banner: Inject<Banner>| async move { banner.text.clone() })
        .get("/missing", |_: Inject<String>| async { "unreachable" });

    let res = router.handle(Request::new(Method::Get, "/banner")).await;
    assert_eq!(text(&res), "Gouel 2025");

    let res = router.handle(Request::new(Method::Get, "/missing")).await;
    assert_eq!(res.status_code(), Status::BadRequest);
    assert!(text(&res).contains("not registered"));
}

#[derive(Clone)]
struct RequestId(u32);

#[tokio::test]
async fn extensions_carry_middleware_values() {
    let router = Router::new()
        .layer(middleware::from_fn(|mut req: Request, next: Next| async move {
            req.insert_extension(RequestId(7));
            next.run(req).await
        }))
        .get("/id", |Extension(RequestId(id)): Extension<RequestId>| async move { id.to_string() });

    assert_eq!(text(&router.handle(Request::new(Method::Get, "/id")).await), "7");

    let bare = Router::new().get("/id", |Extension(RequestId(id)): Extension<RequestId>| async move { id.to_string() });
    assert_eq!(bare.handle(Request::new(Method::Get, "/id")).await.status_code(), Status::BadRequest);
}
