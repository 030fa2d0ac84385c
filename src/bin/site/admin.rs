//! Back office, mounted under `/admin` behind `RequireAuth` and `Csrf`.
//!
//! Forms post back to their own URL; deletes are `POST .../delete` since
//! browsers cannot submit `DELETE`. Successful writes redirect (303) to the
//! list, failed ones re-render the form with the submitted values.

use capsule::extract::{Extension, Form, Inject, Params};
use capsule::{Response, Status};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{self, CurrentUser};
use crate::i18n::Locale;
use crate::repo::{
    Article, ArticleRepository, Event, EventRepository, NewArticle, NewEvent, NewUser, RepoError, UserRepository,
};
use crate::views::{self, Counts, View};

#[derive(Deserialize)]
pub struct IdPath {
    id: u64,
}

// ── Dashboard ─────────────────────────────────────────────────────────────────

// GET /admin
pub async fn dashboard(
    view: View,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Inject(articles): Inject<dyn ArticleRepository>,
    Inject(events): Inject<dyn EventRepository>,
    Inject(users): Inject<dyn UserRepository>,
) -> Response {
    let counts = Counts {
        articles: articles.all().len(),
        events: events.all().len(),
        users: users.all().len(),
    };
    view.page("admin.dashboard", views::dashboard(&view, &user, &counts))
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct UserInput {
    name: String,
    email: String,
    password: String,
}

// GET /admin/users
pub async fn users_index(
    view: View,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Inject(users): Inject<dyn UserRepository>,
) -> Response {
    view.page("admin.users", views::users(&view, &users.all(), me.id, None))
}

// POST /admin/users
pub async fn users_create(
    view: View,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Form(input): Form<UserInput>,
    Inject(users): Inject<dyn UserRepository>,
) -> Response {
    let (name, email) = (input.name.trim(), input.email.trim());
    if name.is_empty() || !email.contains('@') || input.password.is_empty() {
        let body = views::users(&view, &users.all(), me.id, Some(view.t("admin.fields_required")));
        return view.page_with_status(Status::UnprocessableContent, "admin.users", body);
    }
    let new = NewUser {
        name: name.to_owned(),
        email: email.to_owned(),
        password_hash: auth::hash_password(&input.password),
    };
    match users.insert(new) {
        Ok(user) => {
            info!(by = me.id, user = user.id, "user created");
            Response::redirect("/admin/users")
        }
        Err(RepoError::DuplicateEmail(_)) => {
            let body = views::users(&view, &users.all(), me.id, Some(view.t("admin.email_taken")));
            view.page_with_status(Status::Conflict, "admin.users", body)
        }
    }
}

// POST /admin/users/{id}/delete
pub async fn users_delete(
    view: View,
    Params(path): Params<IdPath>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Inject(users): Inject<dyn UserRepository>,
) -> Response {
    if path.id == me.id {
        let body = views::users(&view, &users.all(), me.id, Some(view.t("admin.cannot_delete_self")));
        return view.page_with_status(Status::Conflict, "admin.users", body);
    }
    if !users.delete(path.id) {
        return Response::status(Status::NotFound);
    }
    info!(by = me.id, user = path.id, "user deleted");
    Response::redirect("/admin/users")
}

// ── Articles ──────────────────────────────────────────────────────────────────

/// Article form fields, kept as typed text so a rejected form re-renders
/// exactly what was sent.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ArticleInput {
    pub title: String,
    pub body: String,
    pub locale: String,
    pub published_on: String,
}

impl ArticleInput {
    fn blank(locale: Locale) -> Self {
        Self {
            locale: locale.code().to_owned(),
            published_on: Local::now().date_naive().to_string(),
            ..Self::default()
        }
    }

    fn from_article(a: &Article) -> Self {
        Self {
            title: a.title.clone(),
            body: a.body.clone(),
            locale: a.locale.code().to_owned(),
            published_on: a.published_on.to_string(),
        }
    }

    /// Validates the fields, returning the translation key of the problem.
    fn parse(&self) -> Result<NewArticle, &'static str> {
        if self.title.trim().is_empty() {
            return Err("admin.fields_required");
        }
        let published_on = parse_date(&self.published_on)?;
        Ok(NewArticle {
            title: self.title.trim().to_owned(),
            body: self.body.clone(),
            locale: Locale::parse(&self.locale).unwrap_or_default(),
            published_on,
        })
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, &'static str> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| "admin.invalid_date")
}

// GET /admin/articles
pub async fn articles_index(view: View, Inject(articles): Inject<dyn ArticleRepository>) -> Response {
    view.page("admin.articles", views::article_list(&view, &articles.all(), None))
}

// GET /admin/articles/new
pub async fn article_new(view: View) -> Response {
    let input = ArticleInput::blank(view.locale);
    view.page("admin.create", views::article_form(&view, "/admin/articles", &input, None))
}

// POST /admin/articles
pub async fn article_create(
    view: View,
    Form(input): Form<ArticleInput>,
    Inject(articles): Inject<dyn ArticleRepository>,
) -> Response {
    match input.parse() {
        Ok(new) => {
            let article = articles.insert(new);
            info!(article = article.id, "article created");
            Response::redirect("/admin/articles")
        }
        Err(key) => {
            let body = views::article_form(&view, "/admin/articles", &input, Some(view.t(key)));
            view.page_with_status(Status::UnprocessableContent, "admin.create", body)
        }
    }
}

// GET /admin/articles/{id}
pub async fn article_edit(
    view: View,
    Params(path): Params<IdPath>,
    Inject(articles): Inject<dyn ArticleRepository>,
) -> Response {
    let Some(article) = articles.find(path.id) else {
        return Response::status(Status::NotFound);
    };
    let action = format!("/admin/articles/{}", path.id);
    let input = ArticleInput::from_article(&article);
    view.page("admin.edit", views::article_form(&view, &action, &input, None))
}

// POST /admin/articles/{id}
pub async fn article_update(
    view: View,
    Params(path): Params<IdPath>,
    Form(input): Form<ArticleInput>,
    Inject(articles): Inject<dyn ArticleRepository>,
) -> Response {
    match input.parse() {
        Ok(new) => match articles.update(path.id, new) {
            Some(_) => {
                info!(article = path.id, "article updated");
                Response::redirect("/admin/articles")
            }
            None => Response::status(Status::NotFound),
        },
        Err(key) => {
            let action = format!("/admin/articles/{}", path.id);
            let body = views::article_form(&view, &action, &input, Some(view.t(key)));
            view.page_with_status(Status::UnprocessableContent, "admin.edit", body)
        }
    }
}

// POST /admin/articles/{id}/delete
pub async fn article_delete(Params(path): Params<IdPath>, Inject(articles): Inject<dyn ArticleRepository>) -> Response {
    if !articles.delete(path.id) {
        return Response::status(Status::NotFound);
    }
    info!(article = path.id, "article deleted");
    Response::redirect("/admin/articles")
}

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct EventInput {
    pub title: String,
    pub location: String,
    pub date: String,
    pub description: String,
}

impl EventInput {
    fn from_event(e: &Event) -> Self {
        Self {
            title: e.title.clone(),
            location: e.location.clone(),
            date: e.date.to_string(),
            description: e.description.clone(),
        }
    }

    fn parse(&self) -> Result<NewEvent, &'static str> {
        if self.title.trim().is_empty() {
            return Err("admin.fields_required");
        }
        Ok(NewEvent {
            title: self.title.trim().to_owned(),
            location: self.location.trim().to_owned(),
            date: parse_date(&self.date)?,
            description: self.description.clone(),
        })
    }
}

// GET /admin/events
pub async fn events_index(view: View, Inject(events): Inject<dyn EventRepository>) -> Response {
    view.page("admin.events", views::event_list(&view, &events.all(), None))
}

// GET /admin/events/new
pub async fn event_new(view: View) -> Response {
    let input = EventInput { date: Local::now().date_naive().to_string(), ..EventInput::default() };
    view.page("admin.create", views::event_form(&view, "/admin/events", &input, None))
}

// POST /admin/events
pub async fn event_create(
    view: View,
    Form(input): Form<EventInput>,
    Inject(events): Inject<dyn EventRepository>,
) -> Response {
    match input.parse() {
        Ok(new) => {
            let event = events.insert(new);
            info!(event = event.id, "event created");
            Response::redirect("/admin/events")
        }
        Err(key) => {
            let body = views::event_form(&view, "/admin/events", &input, Some(view.t(key)));
            view.page_with_status(Status::UnprocessableContent, "admin.create", body)
        }
    }
}

// GET /admin/events/{id}
pub async fn event_edit(view: View, Params(path): Params<IdPath>, Inject(events): Inject<dyn EventRepository>) -> Response {
    let Some(event) = events.find(path.id) else {
        return Response::status(Status::NotFound);
    };
    let action = format!("/admin/events/{}", path.id);
    view.page("admin.edit", views::event_form(&view, &action, &EventInput::from_event(&event), None))
}

// POST /admin/events/{id}
pub async fn event_update(
    view: View,
    Params(path): Params<IdPath>,
    Form(input): Form<EventInput>,
    Inject(events): Inject<dyn EventRepository>,
) -> Response {
    match input.parse() {
        Ok(new) => match events.update(path.id, new) {
            Some(_) => {
                info!(event = path.id, "event updated");
                Response::redirect("/admin/events")
            }
            None => Response::status(Status::NotFound),
        },
        Err(key) => {
            let action = format!("/admin/events/{}", path.id);
            let body = views::event_form(&view, &action, &input, Some(view.t(key)));
            view.page_with_status(Status::UnprocessableContent, "admin.edit", body)
        }
    }
}

// POST /admin/events/{id}/delete
pub async fn event_delete(Params(path): Params<IdPath>, Inject(events): Inject<dyn EventRepository>) -> Response {
    if !events.delete(path.id) {
        return Response::status(Status::NotFound);
    }
    info!(event = path.id, "event deleted");
    Response::redirect("/admin/events")
}

// ── Password ──────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PasswordInput {
    current: String,
    new: String,
    confirm: String,
}

// GET /admin/password
pub async fn password_form(view: View) -> Response {
    view.page("admin.password", views::password(&view, None))
}

// POST /admin/password
pub async fn password_update(
    view: View,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Form(input): Form<PasswordInput>,
    Inject(users): Inject<dyn UserRepository>,
) -> Response {
    let problem = if !auth::verify_password(&input.current, &me.password_hash) {
        Some((Status::Forbidden, "admin.password_wrong"))
    } else if input.new.is_empty() || input.new != input.confirm {
        Some((Status::UnprocessableContent, "admin.password_mismatch"))
    } else {
        None
    };

    if let Some((status, key)) = problem {
        return view.page_with_status(status, "admin.password", views::password(&view, Some(view.t(key))));
    }

    if !users.set_password_hash(me.id, auth::hash_password(&input.new)) {
        warn!(user = me.id, "password change for a deleted account");
        let body = views::password(&view, Some(view.t("error.not_found")));
        return view.page_with_status(Status::NotFound, "admin.password", body);
    }
    info!(user = me.id, "password changed");
    view.page("admin.password", views::password(&view, Some(view.t("admin.password_changed"))))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::i18n::Translator;
    use crate::repo::{InMemoryUsers, User};
    use crate::session::SessionStore;

    #[tokio::test]
    async fn password_change_for_a_deleted_account_is_not_found() {
        let store = SessionStore::new(Duration::from_secs(60));
        let view = View::new(Locale::Fr, store.anonymous(), Arc::new(Translator::bundled().unwrap()));
        let gone = User {
            id: 9,
            name: "Anna".into(),
            email: "anna@capsule.bzh".into(),
            password_hash: auth::hash_password("kozh"),
        };
        let input = PasswordInput { current: "kozh".into(), new: "nevez".into(), confirm: "nevez".into() };
        let users: Arc<dyn UserRepository> = Arc::new(InMemoryUsers::default());

        let res = password_update(view, Extension(CurrentUser(gone)), Form(input), Inject(users)).await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[test]
    fn article_input_validation() {
        let mut input = ArticleInput::blank(Locale::Br);
        assert_eq!(input.parse().err(), Some("admin.fields_required"));

        input.title = "  Fest-noz  ".into();
        input.published_on = "2025-13-01".into();
        assert_eq!(input.parse().err(), Some("admin.invalid_date"));

        input.published_on = "2025-06-21".into();
        let new = input.parse().unwrap();
        assert_eq!(new.title, "Fest-noz");
        assert_eq!(new.locale, Locale::Br);
    }

    #[test]
    fn unknown_locale_falls_back_to_default() {
        let input = ArticleInput {
            title: "t".into(),
            locale: "xx".into(),
            published_on: "2025-01-01".into(),
            ..ArticleInput::default()
        };
        assert_eq!(input.parse().unwrap().locale, Locale::Fr);
    }

    #[test]
    fn event_round_trips_through_form() {
        let event = Event {
            id: 3,
            title: "Kentelioù".into(),
            location: "Gwened".into(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            description: String::new(),
        };
        let new = EventInput::from_event(&event).parse().unwrap();
        assert_eq!(new.date, event.date);
        assert_eq!(new.location, "Gwened");
    }
}
