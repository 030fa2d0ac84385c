//! Service registration and the route table.

use std::sync::Arc;
use std::time::Duration;

use capsule::middleware::Trace;
use capsule::{Container, Error, Route, Router};

use crate::admin;
use crate::auth::{self, Csrf, RequireAuth};
use crate::i18n::{LocaleLayer, Translator};
use crate::pages::{self, Gallery};
use crate::repo::{
    ArticleRepository, EventRepository, InMemoryArticles, InMemoryEvents, InMemoryUsers, UserRepository,
};
use crate::session::{SessionLayer, SessionStore};
use crate::settings::Settings;

pub struct App {
    pub router: Router,
    pub sessions: Arc<SessionStore>,
}

pub fn build(settings: &Settings) -> Result<App, Error> {
    let site = &settings.site;
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(site.session_ttl_minutes * 60)));
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUsers::default());
    auth::seed_admin(&users, &site.admin.name, &site.admin.email, &site.admin.password);

    let mut container = Container::new();
    container
        .register::<Translator, _>(|_| {
            Translator::bundled()
                .map(Arc::new)
                .map_err(|e| Error::ServiceBuild { service: "Translator", reason: e.to_string() })
        })
        .instance::<dyn ArticleRepository>(Arc::new(InMemoryArticles::default()))
        .instance::<dyn EventRepository>(Arc::new(InMemoryEvents::default()))
        .instance(users)
        .instance(Arc::clone(&sessions))
        .singleton(Gallery::new(&site.gallery_dir))
        .singleton(site.clone());

    // Surface broken string files at startup rather than on first request.
    container.resolve::<Translator>()?;

    let router = Router::new()
        .with_container(container)
        .layer(Trace)
        .layer(LocaleLayer { default: site.default_locale })
        .layer(SessionLayer { store: Arc::clone(&sessions) })
        .get("/", pages::home)
        .get("/projet", pages::project)
        .get("/galerie", pages::gallery)
        .get("/galerie/{file}", pages::image)
        .get("/contact", pages::contact)
        .route(Route::get("/articles/{id}", pages::article).name("article"))
        .get("/lang/{code}", pages::switch_lang)
        .get("/login", auth::login_form)
        .route(Route::post("/login", auth::login).layer(Csrf))
        .route(Route::post("/logout", auth::logout).layer(Csrf))
        .group("/admin", |group| {
            group
                .layer(RequireAuth)
                .layer(Csrf)
                .get("/", admin::dashboard)
                .get("/users", admin::users_index)
                .post("/users", admin::users_create)
                .post("/users/{id}/delete", admin::users_delete)
                .get("/articles", admin::articles_index)
                .get("/articles/new", admin::article_new)
                .post("/articles", admin::article_create)
                .get("/articles/{id}", admin::article_edit)
                .post("/articles/{id}", admin::article_update)
                .post("/articles/{id}/delete", admin::article_delete)
                .get("/events", admin::events_index)
                .get("/events/new", admin::event_new)
                .post("/events", admin::event_create)
                .get("/events/{id}", admin::event_edit)
                .post("/events/{id}", admin::event_update)
                .post("/events/{id}/delete", admin::event_delete)
                .get("/password", admin::password_form)
                .post("/password", admin::password_update)
        })
        .fallback(pages::not_found);

    Ok(App { router, sessions })
}

#[cfg(test)]
mod tests {
    use capsule::{Method, Request, Response, Status};

    use super::*;
    use crate::session::{Session, COOKIE};

    const ADMIN_EMAIL: &str = "admin@capsule.bzh";
    const ADMIN_PASSWORD: &str = "kouign-amann";

    fn app() -> App {
        let mut settings = Settings::default();
        settings.site.admin.email = ADMIN_EMAIL.into();
        settings.site.admin.password = ADMIN_PASSWORD.into();
        settings.site.gallery_dir = "/nonexistent/gallery".into();
        build(&settings).unwrap()
    }

    fn body(res: &Response) -> String {
        String::from_utf8(res.body().to_vec()).unwrap()
    }

    fn with_session(req: Request, session: &Session) -> Request {
        req.with_header("cookie", &format!("{COOKIE}={}", session.id))
    }

    /// A session already signed in as the seeded administrator.
    fn signed_in(app: &App) -> Session {
        let anon = app.sessions.start();
        app.sessions.login(&anon.id, 1)
    }

    #[tokio::test]
    async fn anonymous_traffic_stores_no_session() {
        let app = app();
        let res = app.router.handle(Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert!(res.header("set-cookie").is_none());
        assert!(body(&res).contains("<h1>Bienvenue</h1>"));

        for i in 0..200 {
            app.router.handle(Request::new(Method::Head, &format!("/nope/{i}"))).await;
            app.router.handle(Request::new(Method::Get, "/galerie")).await;
        }
        assert_eq!(app.sessions.len(), 0);
    }

    #[tokio::test]
    async fn login_form_starts_a_session() {
        let app = app();
        let res = app.router.handle(Request::new(Method::Get, "/login")).await;
        assert_eq!(res.status_code(), Status::Ok);
        let cookie = res.header("set-cookie").unwrap();
        assert!(cookie.starts_with(COOKIE));
        assert_eq!(app.sessions.len(), 1);

        // The token in the form belongs to the stored session.
        let id = cookie.trim_start_matches(&format!("{COOKIE}=")).split(';').next().unwrap();
        let stored = app.sessions.get(id).unwrap();
        assert!(body(&res).contains(&stored.csrf_token));

        let again = Request::new(Method::Get, "/login").with_header("cookie", &format!("{COOKIE}={id}"));
        app.router.handle(again).await;
        assert_eq!(app.sessions.len(), 1);
    }

    #[tokio::test]
    async fn live_session_cookie_is_refreshed() {
        let app = app();
        let session = signed_in(&app);
        for path in ["/", "/admin", "/nope"] {
            let res = app.router.handle(with_session(Request::new(Method::Get, path), &session)).await;
            let cookie = res.header("set-cookie").unwrap();
            assert!(cookie.starts_with(&format!("{COOKIE}={};", session.id)), "{path}");
            assert!(cookie.contains("Max-Age="), "{path}");
        }
    }

    #[tokio::test]
    async fn language_cookie_switches_strings() {
        let app = app();
        let res = app.router.handle(Request::new(Method::Get, "/").with_header("cookie", "lang=br")).await;
        assert!(body(&res).contains("<h1>Degemer mat</h1>"));

        let res = app
            .router
            .handle(Request::new(Method::Get, "/lang/br").with_header("referer", "http://localhost/contact"))
            .await;
        assert_eq!(res.status_code(), Status::SeeOther);
        assert_eq!(res.header("location"), Some("/contact"));
        let cookies: Vec<_> = res.headers().iter().filter(|(k, _)| k == "set-cookie").map(|(_, v)| v.as_str()).collect();
        assert!(cookies.iter().any(|c| c.starts_with("lang=br;")));
    }

    #[tokio::test]
    async fn unknown_pages_use_the_localized_fallback() {
        let app = app();
        let res = app.router.handle(Request::new(Method::Get, "/nope").with_header("cookie", "lang=br")).await;
        assert_eq!(res.status_code(), Status::NotFound);
        assert!(body(&res).contains("N&#39;eo ket bet kavet"));

        let res = app.router.handle(Request::new(Method::Get, "/articles/999")).await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[tokio::test]
    async fn admin_requires_a_signed_in_session() {
        let app = app();
        let res = app.router.handle(Request::new(Method::Get, "/admin")).await;
        assert_eq!(res.status_code(), Status::SeeOther);
        assert_eq!(res.header("location"), Some("/login"));
    }

    #[tokio::test]
    async fn login_checks_token_and_password() {
        let app = app();
        let anon = app.sessions.start();
        let post = |fields: &[(&str, &str)]| with_session(Request::new(Method::Post, "/login").with_form(fields), &anon);

        let res = app.router.handle(post(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])).await;
        assert_eq!(res.status_code(), Status::Forbidden);

        let res = app
            .router
            .handle(post(&[("_csrf", anon.csrf_token.as_str()), ("email", ADMIN_EMAIL), ("password", "wrong")]))
            .await;
        assert_eq!(res.status_code(), Status::Unauthorized);

        let res = app
            .router
            .handle(post(&[("_csrf", anon.csrf_token.as_str()), ("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)]))
            .await;
        assert_eq!(res.status_code(), Status::SeeOther);
        assert_eq!(res.header("location"), Some("/admin"));
        let cookie = res.header("set-cookie").unwrap();
        assert!(!cookie.contains(&anon.id));

        let id = cookie.trim_start_matches(&format!("{COOKIE}=")).split(';').next().unwrap();
        let res = app
            .router
            .handle(Request::new(Method::Get, "/admin").with_header("cookie", &format!("{COOKIE}={id}")))
            .await;
        assert_eq!(res.status_code(), Status::Ok);
        assert!(body(&res).contains("Admin"));
    }

    #[tokio::test]
    async fn article_crud_behind_csrf() {
        let app = app();
        let session = signed_in(&app);
        let fields = [("title", "Fest-noz"), ("locale", "fr"), ("published_on", "2025-06-21"), ("body", "Dañs!")];

        let res = app
            .router
            .handle(with_session(Request::new(Method::Post, "/admin/articles").with_form(&fields), &session))
            .await;
        assert_eq!(res.status_code(), Status::Forbidden);

        let mut with_token = vec![("_csrf", session.csrf_token.as_str())];
        with_token.extend(fields);
        let res = app
            .router
            .handle(with_session(Request::new(Method::Post, "/admin/articles").with_form(&with_token), &session))
            .await;
        assert_eq!(res.status_code(), Status::SeeOther);

        let res = app.router.handle(Request::new(Method::Get, "/articles/1")).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert!(body(&res).contains("Fest-noz"));
        let res = app.router.handle(Request::new(Method::Get, "/")).await;
        assert!(body(&res).contains(r#"href="/articles/1""#));

        let res = app
            .router
            .handle(with_session(
                Request::new(Method::Post, "/admin/articles/1/delete").with_form(&[("_csrf", session.csrf_token.as_str())]),
                &session,
            ))
            .await;
        assert_eq!(res.status_code(), Status::SeeOther);
        let res = app.router.handle(Request::new(Method::Get, "/articles/1")).await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[tokio::test]
    async fn invalid_event_date_rerenders_form() {
        let app = app();
        let session = signed_in(&app);
        let req = Request::new(Method::Post, "/admin/events").with_form(&[
            ("_csrf", session.csrf_token.as_str()),
            ("title", "Kan ha diskan"),
            ("date", "21/06/2025"),
        ]);
        let res = app.router.handle(with_session(req, &session)).await;
        assert_eq!(res.status_code(), Status::UnprocessableContent);
        assert!(body(&res).contains("Kan ha diskan"));
    }

    #[tokio::test]
    async fn cannot_delete_own_account() {
        let app = app();
        let session = signed_in(&app);
        let req = Request::new(Method::Post, "/admin/users/1/delete").with_form(&[("_csrf", session.csrf_token.as_str())]);
        let res = app.router.handle(with_session(req, &session)).await;
        assert_eq!(res.status_code(), Status::Conflict);
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let app = app();
        let session = signed_in(&app);
        let change = |current: &str, new: &str, confirm: &str| {
            let req = Request::new(Method::Post, "/admin/password").with_form(&[
                ("_csrf", session.csrf_token.as_str()),
                ("current", current),
                ("new", new),
                ("confirm", confirm),
            ]);
            with_session(req, &session)
        };

        let res = app.router.handle(change("wrong", "a", "a")).await;
        assert_eq!(res.status_code(), Status::Forbidden);
        let res = app.router.handle(change(ADMIN_PASSWORD, "a", "b")).await;
        assert_eq!(res.status_code(), Status::UnprocessableContent);
        let res = app.router.handle(change(ADMIN_PASSWORD, "gwin-ardant", "gwin-ardant")).await;
        assert_eq!(res.status_code(), Status::Ok);

        let res = app.router.handle(change(ADMIN_PASSWORD, "x", "x")).await;
        assert_eq!(res.status_code(), Status::Forbidden);
    }

    #[tokio::test]
    async fn head_serves_get_routes_without_body() {
        let app = app();
        let res = app.router.handle(Request::new(Method::Head, "/projet")).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert!(res.body().is_empty());
    }

    #[test]
    fn article_route_is_named() {
        assert_eq!(app().router.url_for("article", &[("id", "7")]).unwrap(), "/articles/7");
    }
}
