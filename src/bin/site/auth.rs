//! Password hashing, the login flow, and the middleware guarding `/admin`.

use std::sync::Arc;

use capsule::extract::{Extension, Form, Inject};
use capsule::middleware::{Middleware, Next};
use capsule::{BoxFuture, Request, Response, Status};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::repo::{User, UserRepository};
use crate::session::{self, Session, SessionStore};
use crate::views::{self, View};

pub const CSRF_FIELD: &str = "_csrf";

// ── Passwords ─────────────────────────────────────────────────────────────────

/// Hashes `password` under a fresh random salt, as `salt$hexdigest`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    constant_time_eq(&digest(salt, password), expected)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// The signed-in user, stored on the request by [`RequireAuth`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Lets the request through only for a session bound to an existing user;
/// everybody else is sent to `/login`.
pub struct RequireAuth;

impl Middleware for RequireAuth {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture {
        let user = req
            .extension::<Session>()
            .and_then(|s| s.user_id)
            .and_then(|id| {
                let users = req.container().resolve::<dyn UserRepository>().ok()?;
                users.find(id)
            });

        match user {
            Some(user) => {
                req.insert_extension(CurrentUser(user));
                next.run(req)
            }
            None => {
                info!(path = req.path(), "unauthenticated, redirecting to login");
                Box::pin(async { Response::redirect("/login") })
            }
        }
    }
}

/// Rejects unsafe requests whose `_csrf` form field does not match the
/// session token.
pub struct Csrf;

impl Middleware for Csrf {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        if req.method().is_safe() {
            return next.run(req);
        }
        let valid = match (req.extension::<Session>(), req.form_value(CSRF_FIELD)) {
            (Some(session), Some(sent)) => constant_time_eq(&session.csrf_token, &sent),
            _ => false,
        };
        if valid {
            next.run(req)
        } else {
            warn!(method = %req.method(), path = req.path(), "csrf token mismatch");
            Box::pin(async { Response::builder().status(Status::Forbidden).text("Forbidden") })
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

// GET /login
pub async fn login_form(view: View, Inject(sessions): Inject<SessionStore>) -> Response {
    if view.signed_in() {
        return Response::redirect("/admin");
    }
    // The form carries this session's token, so it has to outlive the page.
    let res = view.page("login.title", views::login(&view, "", None));
    if sessions.persist(&view.session) {
        res.with_header("set-cookie", &session::set_cookie(&view.session, sessions.ttl()))
    } else {
        res
    }
}

// POST /login
pub async fn login(
    view: View,
    Form(credentials): Form<Credentials>,
    Inject(users): Inject<dyn UserRepository>,
    Inject(sessions): Inject<SessionStore>,
) -> Response {
    let user = users
        .find_by_email(credentials.email.trim())
        .filter(|u| verify_password(&credentials.password, &u.password_hash));

    let Some(user) = user else {
        warn!(email = %credentials.email, "failed login");
        let body = views::login(&view, &credentials.email, Some(view.t("login.failed")));
        return view.page_with_status(Status::Unauthorized, "login.title", body);
    };

    info!(user = user.id, "signed in");
    let session = sessions.login(&view.session.id, user.id);
    Response::redirect("/admin").with_header("set-cookie", &session::set_cookie(&session, sessions.ttl()))
}

// POST /logout
pub async fn logout(Extension(current): Extension<Session>, Inject(sessions): Inject<SessionStore>) -> Response {
    sessions.destroy(&current.id);
    if let Some(user) = current.user_id {
        info!(user, "signed out");
    }
    Response::redirect("/").with_header("set-cookie", &session::clear_cookie())
}

/// Creates the configured administrator unless the address is taken.
pub fn seed_admin(users: &Arc<dyn UserRepository>, name: &str, email: &str, password: &str) {
    if users.find_by_email(email).is_some() {
        return;
    }
    let new = crate::repo::NewUser {
        name: name.to_owned(),
        email: email.to_owned(),
        password_hash: hash_password(password),
    };
    match users.insert(new) {
        Ok(user) => info!(user = user.id, email, "administrator account created"),
        Err(e) => warn!(error = %e, "could not create administrator account"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verify() {
        let a = hash_password("kenavo");
        let b = hash_password("kenavo");
        assert_ne!(a, b);
        assert!(verify_password("kenavo", &a));
        assert!(verify_password("kenavo", &b));
        assert!(!verify_password("kenavo!", &a));
        assert!(!verify_password("kenavo", "no-separator"));
    }

    #[test]
    fn digest_layout() {
        let (salt, hex_digest) = hash_password("x").split_once('$').map(|(s, d)| (s.to_owned(), d.to_owned())).unwrap();
        assert_eq!(salt.len(), 32);
        assert_eq!(hex_digest.len(), 64);
        assert_eq!(digest(&salt, "x"), hex_digest);
    }
}
