//! # capsule
//!
//! A small HTTP micro-framework: a router compiled from path patterns, a
//! middleware pipeline, typed argument binding and a singleton service
//! container. The association website in `src/bin/site` is built on it.
//!
//! ## Request pipeline
//!
//! ```text
//! hyper ─▶ Request ─▶ global middleware ─▶ route lookup ─▶ route middleware ─▶ handler(args…)
//!                                          │ 404 / 405                          ▲
//!                                          ▼                                    │ FromRequest
//!                                        fixed response            Params / Query / Form / Inject
//! ```
//!
//! - Path patterns use `{name}` placeholders. `id`, `slug` and `uuid` have
//!   their own sub-patterns; any other name matches one path segment.
//! - Method negotiation: `405` carries an `Allow` header; `HEAD` works
//!   wherever `GET` does.
//! - Handler arguments are bound by type; a failed binding answers `400`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use capsule::extract::Params;
//! use capsule::middleware::Trace;
//! use capsule::{Request, Response, Router, Server, Status};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ArticlePath { id: u64 }
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .layer(Trace)
//!         .get("/articles/{id}", show_article)
//!         .post("/contact", contact);
//!
//!     Server::bind("0.0.0.0:3000".parse().unwrap()).serve(app).await.unwrap();
//! }
//!
//! async fn show_article(Params(path): Params<ArticlePath>) -> Response {
//!     Response::html(format!("<h1>Article {}</h1>", path.id))
//! }
//!
//! async fn contact(req: Request) -> Response {
//!     if req.form_value("message").is_none() {
//!         return Response::status(Status::BadRequest);
//!     }
//!     Response::redirect("/contact?sent=1")
//! }
//! ```

mod de;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod config;
pub mod container;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod route;
pub mod template;

pub use container::Container;
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use method::{Method, UnknownMethod};
pub use request::{Extensions, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use route::Route;
pub use router::{Group, Router};
pub use server::Server;
pub use status::Status;
