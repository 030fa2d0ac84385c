//! Minimal capsule example: typed route parameters, a service from the
//! container, a form post, and the tracing middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/articles/42
//!   curl http://localhost:3000/articles/abc          # 404: `id` is digits only
//!   curl -X DELETE http://localhost:3000/articles/42 # 405 with an Allow header
//!   curl -X POST http://localhost:3000/contact -d 'name=Anna&message=Demat'

use std::sync::Arc;

use capsule::extract::{Form, Inject, Params};
use capsule::middleware::Trace;
use capsule::{Container, Response, Router, Server, Status};
use serde::Deserialize;

struct Greeting(&'static str);

#[derive(Deserialize)]
struct ArticlePath {
    id: u64,
}

#[derive(Deserialize)]
struct ContactForm {
    name: String,
    message: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut container = Container::new();
    container.register::<Greeting, _>(|_| Ok(Arc::new(Greeting("Demat"))));

    let app = Router::new()
        .with_container(container)
        .layer(Trace)
        .get("/articles/{id}", show_article)
        .post("/contact", contact);

    Server::bind(([127, 0, 0, 1], 3000).into())
        .serve(app)
        .await
        .expect("server error");
}

// GET /articles/{id}
async fn show_article(Params(path): Params<ArticlePath>, greeting: Inject<Greeting>) -> Response {
    Response::html(format!("<p>{}! Article #{}</p>", greeting.0.0, path.id))
}

// POST /contact
async fn contact(Form(form): Form<ContactForm>) -> (Status, String) {
    (Status::Created, format!("thanks {}, {} bytes received", form.name, form.message.len()))
}
