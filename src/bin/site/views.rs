//! HTML rendering.
//!
//! Every page is a body template rendered into `layout.html`. Templates see
//! all translated strings under their dotted names (`{{ nav.home }}`) plus
//! `lang` and `csrf`; lists are built here and passed in as raw HTML.

use std::fmt::Write;
use std::sync::Arc;

use capsule::extract::{FromRequest, Rejection};
use capsule::template::{self, escape, Context};
use capsule::{Request, Response, Status};

use crate::admin::{ArticleInput, EventInput};
use crate::auth::CSRF_FIELD;
use crate::i18n::{Locale, Translator};
use crate::repo::{Article, Event, User};
use crate::session::Session;

const LAYOUT: &str = include_str!("../../../templates/layout.html");
const HOME: &str = include_str!("../../../templates/home.html");
const ARTICLE: &str = include_str!("../../../templates/article.html");
const GALLERY: &str = include_str!("../../../templates/gallery.html");
const CONTACT: &str = include_str!("../../../templates/contact.html");
const LOGIN: &str = include_str!("../../../templates/login.html");
const DASHBOARD: &str = include_str!("../../../templates/admin/dashboard.html");
const USERS: &str = include_str!("../../../templates/admin/users.html");
const LIST: &str = include_str!("../../../templates/admin/list.html");
const ARTICLE_FORM: &str = include_str!("../../../templates/admin/article_form.html");
const EVENT_FORM: &str = include_str!("../../../templates/admin/event_form.html");
const PASSWORD: &str = include_str!("../../../templates/admin/password.html");

/// Everything a handler needs to render a page for the current visitor.
pub struct View {
    pub locale: Locale,
    pub session: Session,
    translator: Arc<Translator>,
}

impl FromRequest for View {
    fn from_request(req: &Request) -> Result<Self, Rejection> {
        let translator = req.container().resolve::<Translator>().map_err(|e| Rejection::new(e.to_string()))?;
        let session = req
            .extension::<Session>()
            .cloned()
            .ok_or_else(|| Rejection::new("request has no session"))?;
        let locale = req.extension::<Locale>().copied().unwrap_or_default();
        Ok(Self::new(locale, session, translator))
    }
}

impl View {
    pub fn new(locale: Locale, session: Session, translator: Arc<Translator>) -> Self {
        Self { locale, session, translator }
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.translator.get(self.locale, key)
    }

    pub fn signed_in(&self) -> bool {
        self.session.user_id.is_some()
    }

    pub fn csrf_field(&self) -> String {
        format!(r#"<input type="hidden" name="{CSRF_FIELD}" value="{}">"#, escape(&self.session.csrf_token))
    }

    /// Renders `template` with the shared context, after `fill` adds the
    /// page's own values.
    pub fn render(&self, template: &str, fill: impl FnOnce(&mut Context)) -> String {
        let mut ctx = self.translator.context(self.locale);
        ctx.insert("lang", self.locale.code());
        ctx.insert("csrf", self.csrf_field());
        fill(&mut ctx);
        template::render(template, &ctx)
    }

    /// A full `200 OK` page titled by the translation of `title_key`.
    pub fn page(&self, title_key: &str, body: String) -> Response {
        self.page_with_status(Status::Ok, title_key, body)
    }

    pub fn page_with_status(&self, status: Status, title_key: &str, body: String) -> Response {
        let title = self.t(title_key).to_owned();
        self.document(status, &title, body)
    }

    /// A full page whose title is content rather than a translation key.
    pub fn document(&self, status: Status, title: &str, body: String) -> Response {
        let nav = self.nav();
        let html = self.render(LAYOUT, |ctx| {
            ctx.insert("title", title);
            ctx.insert("nav", nav);
            ctx.insert("body", body);
        });
        Response::builder().status(status).html(html)
    }

    fn nav(&self) -> String {
        let mut html = String::from("<ul>");
        for (href, key) in [("/", "nav.home"), ("/projet", "nav.project"), ("/galerie", "nav.gallery"), ("/contact", "nav.contact")] {
            let _ = write!(html, r#"<li><a href="{href}">{}</a></li>"#, escape(self.t(key)));
        }
        if self.signed_in() {
            let _ = write!(
                html,
                r#"<li><a href="/admin">{}</a></li><li><form method="post" action="/logout">{}<button type="submit">{}</button></form></li>"#,
                escape(self.t("nav.admin")),
                self.csrf_field(),
                escape(self.t("nav.logout")),
            );
        } else {
            let _ = write!(html, r#"<li><a href="/login">{}</a></li>"#, escape(self.t("nav.login")));
        }
        html.push_str(r#"</ul><ul class="lang">"#);
        for locale in Locale::ALL {
            let code = locale.code();
            let current = if locale == self.locale { r#" aria-current="true""# } else { "" };
            let _ = write!(html, r#"<li><a href="/lang/{code}" hreflang="{code}"{current}>{}</a></li>"#, code.to_uppercase());
        }
        html.push_str("</ul>");
        html
    }
}

fn flash(message: Option<&str>) -> String {
    message.map(|m| format!(r#"<p class="flash">{}</p>"#, escape(m))).unwrap_or_default()
}

fn delete_button(view: &View, action: &str) -> String {
    format!(
        r#"<form method="post" action="{action}" class="inline">{}<button type="submit">{}</button></form>"#,
        view.csrf_field(),
        escape(view.t("admin.delete")),
    )
}

// ── Public pages ──────────────────────────────────────────────────────────────

pub fn home(view: &View, articles: &[Article], events: &[Event]) -> String {
    let articles = if articles.is_empty() {
        format!("<p>{}</p>", escape(view.t("home.no_articles")))
    } else {
        let mut html = String::from(r#"<ul class="articles">"#);
        for a in articles {
            let _ = write!(
                html,
                r#"<li><a href="/articles/{}">{}</a> <time>{}</time></li>"#,
                a.id,
                escape(&a.title),
                a.published_on,
            );
        }
        html.push_str("</ul>");
        html
    };
    let events = if events.is_empty() {
        format!("<p>{}</p>", escape(view.t("home.no_events")))
    } else {
        let mut html = String::from(r#"<ul class="events">"#);
        for e in events {
            let _ = write!(
                html,
                "<li><time>{}</time> <strong>{}</strong> {} <p>{}</p></li>",
                e.date,
                escape(&e.title),
                escape(&e.location),
                escape(&e.description),
            );
        }
        html.push_str("</ul>");
        html
    };
    view.render(HOME, |ctx| {
        ctx.insert("articles", articles);
        ctx.insert("events", events);
    })
}

pub fn project(view: &View) -> String {
    format!("<p>{}</p>", escape(view.t("project.body")))
}

pub fn contact(view: &View, email: &str) -> String {
    view.render(CONTACT, |ctx| ctx.insert("email", email))
}

pub fn article(view: &View, article: &Article) -> String {
    let mut body = String::new();
    for paragraph in article.body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let _ = write!(body, "<p>{}</p>", escape(paragraph));
    }
    view.render(ARTICLE, |ctx| {
        ctx.insert("published_on", article.published_on.to_string());
        ctx.insert("body", body);
    })
}

pub fn gallery(view: &View, images: &[String]) -> String {
    let images = if images.is_empty() {
        format!("<p>{}</p>", escape(view.t("gallery.empty")))
    } else {
        let mut html = String::new();
        for name in images {
            let name = escape(name);
            let _ = write!(html, r#"<figure><img src="/galerie/{name}" alt="{name}" loading="lazy"></figure>"#);
        }
        html
    };
    view.render(GALLERY, |ctx| ctx.insert("images", images))
}

pub fn login(view: &View, email: &str, error: Option<&str>) -> String {
    view.render(LOGIN, |ctx| {
        ctx.insert("email", email);
        ctx.insert("error", flash(error));
    })
}

// ── Administration ────────────────────────────────────────────────────────────

pub struct Counts {
    pub articles: usize,
    pub events: usize,
    pub users: usize,
}

pub fn dashboard(view: &View, user: &User, counts: &Counts) -> String {
    view.render(DASHBOARD, |ctx| {
        ctx.insert("name", user.name.as_str());
        ctx.insert("article_count", counts.articles.to_string());
        ctx.insert("event_count", counts.events.to_string());
        ctx.insert("user_count", counts.users.to_string());
    })
}

pub fn users(view: &View, users: &[User], current: u64, message: Option<&str>) -> String {
    let mut rows = String::new();
    for u in users {
        let action = if u.id == current {
            String::new()
        } else {
            delete_button(view, &format!("/admin/users/{}/delete", u.id))
        };
        let _ = write!(rows, "<tr><td>{}</td><td>{}</td><td>{action}</td></tr>", escape(&u.name), escape(&u.email));
    }
    view.render(USERS, |ctx| {
        ctx.insert("rows", rows);
        ctx.insert("flash", flash(message));
    })
}

pub fn article_list(view: &View, articles: &[Article], message: Option<&str>) -> String {
    let mut rows = String::new();
    for a in articles {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td>{}</td><td><a href="/admin/articles/{id}">{}</a></td><td>{}</td><td>{}</td></tr>"#,
            a.published_on,
            a.locale,
            escape(&a.title),
            escape(view.t("admin.edit")),
            delete_button(view, &format!("/admin/articles/{}/delete", a.id)),
            id = a.id,
        );
    }
    list(view, "/admin/articles/new", rows, message)
}

pub fn event_list(view: &View, events: &[Event], message: Option<&str>) -> String {
    let mut rows = String::new();
    for e in events {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td><a href="/admin/events/{id}">{}</a></td><td>{}</td><td>{}</td></tr>"#,
            e.date,
            escape(&e.title),
            escape(&e.location),
            delete_button(view, &format!("/admin/events/{}/delete", e.id)),
            id = e.id,
        );
    }
    list(view, "/admin/events/new", rows, message)
}

fn list(view: &View, new_url: &str, rows: String, message: Option<&str>) -> String {
    view.render(LIST, |ctx| {
        ctx.insert("new_url", new_url);
        ctx.insert("rows", rows);
        ctx.insert("flash", flash(message));
    })
}

pub fn article_form(view: &View, action: &str, input: &ArticleInput, message: Option<&str>) -> String {
    let mut locales = String::new();
    for locale in Locale::ALL {
        let selected = if input.locale == locale.code() { " selected" } else { "" };
        let _ = write!(locales, r#"<option value="{0}"{selected}>{0}</option>"#, locale.code());
    }
    view.render(ARTICLE_FORM, |ctx| {
        ctx.insert("action", action);
        ctx.insert("title", input.title.as_str());
        ctx.insert("published_on", input.published_on.as_str());
        ctx.insert("body", input.body.as_str());
        ctx.insert("locales", locales);
        ctx.insert("flash", flash(message));
    })
}

pub fn event_form(view: &View, action: &str, input: &EventInput, message: Option<&str>) -> String {
    view.render(EVENT_FORM, |ctx| {
        ctx.insert("action", action);
        ctx.insert("title", input.title.as_str());
        ctx.insert("location", input.location.as_str());
        ctx.insert("date", input.date.as_str());
        ctx.insert("description", input.description.as_str());
        ctx.insert("flash", flash(message));
    })
}

pub fn password(view: &View, message: Option<&str>) -> String {
    view.render(PASSWORD, |ctx| ctx.insert("flash", flash(message)))
}
