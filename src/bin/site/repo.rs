//! Articles, agenda events and users.
//!
//! Repositories are traits so the container can hand out any backend; the
//! site ships in-memory tables. Rows leave a repository as immutable DTOs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::i18n::Locale;

// ── DTOs ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub locale: Locale,
    pub published_on: NaiveDate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    pub locale: Locale,
    pub published_on: NaiveDate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub location: String,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub location: String,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("e-mail `{0}` is already registered")]
    DuplicateEmail(String),
}

// ── Repository traits ─────────────────────────────────────────────────────────

pub trait ArticleRepository: Send + Sync {
    /// Newest first.
    fn all(&self) -> Vec<Article>;
    fn latest(&self, locale: Locale, limit: usize) -> Vec<Article>;
    fn find(&self, id: u64) -> Option<Article>;
    fn insert(&self, article: NewArticle) -> Article;
    fn update(&self, id: u64, article: NewArticle) -> Option<Article>;
    fn delete(&self, id: u64) -> bool;
}

pub trait EventRepository: Send + Sync {
    /// Soonest first.
    fn all(&self) -> Vec<Event>;
    fn upcoming(&self, from: NaiveDate, limit: usize) -> Vec<Event>;
    fn find(&self, id: u64) -> Option<Event>;
    fn insert(&self, event: NewEvent) -> Event;
    fn update(&self, id: u64, event: NewEvent) -> Option<Event>;
    fn delete(&self, id: u64) -> bool;
}

pub trait UserRepository: Send + Sync {
    fn all(&self) -> Vec<User>;
    fn find(&self, id: u64) -> Option<User>;
    fn find_by_email(&self, email: &str) -> Option<User>;
    fn insert(&self, user: NewUser) -> Result<User, RepoError>;
    fn set_password_hash(&self, id: u64, password_hash: String) -> bool;
    fn delete(&self, id: u64) -> bool;
}

// ── In-memory backend ─────────────────────────────────────────────────────────

/// Auto-incrementing table shared by the in-memory repositories.
struct Table<T> {
    inner: Mutex<(u64, BTreeMap<u64, T>)>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self { inner: Mutex::new((0, BTreeMap::new())) }
    }

    fn insert(&self, build: impl FnOnce(u64) -> T) -> T {
        let mut inner = self.inner.lock();
        inner.0 += 1;
        let id = inner.0;
        let row = build(id);
        inner.1.insert(id, row.clone());
        row
    }

    fn rows(&self) -> Vec<T> {
        self.inner.lock().1.values().cloned().collect()
    }

    fn get(&self, id: u64) -> Option<T> {
        self.inner.lock().1.get(&id).cloned()
    }

    fn replace(&self, id: u64, build: impl FnOnce(&T) -> T) -> Option<T> {
        let mut inner = self.inner.lock();
        let row = inner.1.get_mut(&id)?;
        *row = build(row);
        Some(row.clone())
    }

    fn remove(&self, id: u64) -> bool {
        self.inner.lock().1.remove(&id).is_some()
    }
}

pub struct InMemoryArticles(Table<Article>);

impl Default for InMemoryArticles {
    fn default() -> Self { Self(Table::new()) }
}

impl ArticleRepository for InMemoryArticles {
    fn all(&self) -> Vec<Article> {
        let mut rows = self.0.rows();
        rows.sort_by(|a, b| b.published_on.cmp(&a.published_on).then(b.id.cmp(&a.id)));
        rows
    }

    fn latest(&self, locale: Locale, limit: usize) -> Vec<Article> {
        self.all().into_iter().filter(|a| a.locale == locale).take(limit).collect()
    }

    fn find(&self, id: u64) -> Option<Article> {
        self.0.get(id)
    }

    fn insert(&self, a: NewArticle) -> Article {
        self.0.insert(|id| Article {
            id,
            title: a.title,
            body: a.body,
            locale: a.locale,
            published_on: a.published_on,
        })
    }

    fn update(&self, id: u64, a: NewArticle) -> Option<Article> {
        self.0.replace(id, |_| Article {
            id,
            title: a.title,
            body: a.body,
            locale: a.locale,
            published_on: a.published_on,
        })
    }

    fn delete(&self, id: u64) -> bool {
        self.0.remove(id)
    }
}

pub struct InMemoryEvents(Table<Event>);

impl Default for InMemoryEvents {
    fn default() -> Self { Self(Table::new()) }
}

impl EventRepository for InMemoryEvents {
    fn all(&self) -> Vec<Event> {
        let mut rows = self.0.rows();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        rows
    }

    fn upcoming(&self, from: NaiveDate, limit: usize) -> Vec<Event> {
        self.all().into_iter().filter(|e| e.date >= from).take(limit).collect()
    }

    fn find(&self, id: u64) -> Option<Event> {
        self.0.get(id)
    }

    fn insert(&self, e: NewEvent) -> Event {
        self.0.insert(|id| Event {
            id,
            title: e.title,
            location: e.location,
            date: e.date,
            description: e.description,
        })
    }

    fn update(&self, id: u64, e: NewEvent) -> Option<Event> {
        self.0.replace(id, |_| Event {
            id,
            title: e.title,
            location: e.location,
            date: e.date,
            description: e.description,
        })
    }

    fn delete(&self, id: u64) -> bool {
        self.0.remove(id)
    }
}

pub struct InMemoryUsers(Table<User>);

impl Default for InMemoryUsers {
    fn default() -> Self { Self(Table::new()) }
}

impl UserRepository for InMemoryUsers {
    fn all(&self) -> Vec<User> {
        self.0.rows()
    }

    fn find(&self, id: u64) -> Option<User> {
        self.0.get(id)
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.0.rows().into_iter().find(|u| u.email.eq_ignore_ascii_case(email))
    }

    fn insert(&self, u: NewUser) -> Result<User, RepoError> {
        // Check and insert under one lock so two sign-ups cannot race.
        let mut inner = self.0.inner.lock();
        if inner.1.values().any(|existing| existing.email.eq_ignore_ascii_case(&u.email)) {
            return Err(RepoError::DuplicateEmail(u.email));
        }
        inner.0 += 1;
        let user = User { id: inner.0, name: u.name, email: u.email, password_hash: u.password_hash };
        inner.1.insert(user.id, user.clone());
        Ok(user)
    }

    fn set_password_hash(&self, id: u64, password_hash: String) -> bool {
        self.0.replace(id, |u| User { password_hash, ..u.clone() }).is_some()
    }

    fn delete(&self, id: u64) -> bool {
        self.0.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn article(title: &str, locale: Locale, on: &str) -> NewArticle {
        NewArticle { title: title.into(), body: String::new(), locale, published_on: date(on) }
    }

    #[test]
    fn articles_newest_first_per_locale() {
        let repo = InMemoryArticles::default();
        repo.insert(article("old", Locale::Fr, "2024-01-01"));
        repo.insert(article("new", Locale::Fr, "2025-03-01"));
        repo.insert(article("nevez", Locale::Br, "2025-04-01"));
        let titles: Vec<_> = repo.latest(Locale::Fr, 5).into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["new", "old"]);
        assert_eq!(repo.all()[0].title, "nevez");
    }

    #[test]
    fn article_update_and_delete() {
        let repo = InMemoryArticles::default();
        let a = repo.insert(article("a", Locale::Fr, "2024-01-01"));
        let updated = repo.update(a.id, article("b", Locale::Br, "2024-02-02")).unwrap();
        assert_eq!(updated.id, a.id);
        assert_eq!(repo.find(a.id).unwrap().title, "b");
        assert!(repo.update(99, article("x", Locale::Fr, "2024-01-01")).is_none());
        assert!(repo.delete(a.id));
        assert!(!repo.delete(a.id));
    }

    #[test]
    fn upcoming_events_skip_past_ones() {
        let repo = InMemoryEvents::default();
        for (title, on) in [("later", "2025-08-01"), ("past", "2025-01-01"), ("soon", "2025-06-01")] {
            repo.insert(NewEvent { title: title.into(), location: "Kemper".into(), date: date(on), description: String::new() });
        }
        let titles: Vec<_> = repo.upcoming(date("2025-05-01"), 10).into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["soon", "later"]);
    }

    #[test]
    fn user_emails_are_unique_case_insensitively() {
        let repo = InMemoryUsers::default();
        let new = |email: &str| NewUser { name: "n".into(), email: email.into(), password_hash: "h".into() };
        let u = repo.insert(new("anna@ti.bzh")).unwrap();
        assert_eq!(repo.insert(new("ANNA@ti.bzh")), Err(RepoError::DuplicateEmail("ANNA@ti.bzh".into())));
        assert_eq!(repo.find_by_email("Anna@Ti.bzh").unwrap().id, u.id);
        assert!(repo.set_password_hash(u.id, "h2".into()));
        assert_eq!(repo.find(u.id).unwrap().password_hash, "h2");
    }
}
