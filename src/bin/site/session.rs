//! In-memory sessions keyed by a random cookie token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use capsule::middleware::{Middleware, Next};
use capsule::{BoxFuture, Request};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

pub const COOKIE: &str = "capsule_session";

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub user_id: Option<u64>,
    pub csrf_token: String,
    expires_at: Instant,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// A fresh anonymous session that is not stored yet.
    pub fn anonymous(&self) -> Session {
        Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id: None,
            csrf_token: Uuid::new_v4().simple().to_string(),
            expires_at: Instant::now() + self.ttl,
        }
    }

    /// Creates and stores a fresh anonymous session.
    pub fn start(&self) -> Session {
        let session = self.anonymous();
        self.persist(&session);
        session
    }

    /// Stores `session` unless it is already stored. Returns `true` when it
    /// was added.
    pub fn persist(&self, session: &Session) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&session.id) {
            return false;
        }
        let mut stored = session.clone();
        stored.expires_at = Instant::now() + self.ttl;
        debug!(session = %stored.id, "session started");
        sessions.insert(stored.id.clone(), stored);
        true
    }

    pub fn len(&self) -> usize { self.sessions.lock().len() }

    /// Returns a live session and slides its expiry forward.
    pub fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock();
        let now = Instant::now();
        match sessions.get_mut(id) {
            Some(s) if s.expires_at > now => {
                s.expires_at = now + self.ttl;
                Some(s.clone())
            }
            Some(_) => {
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    /// Replaces the session with a new id and token bound to `user_id`,
    /// so a token known before login is useless after it.
    pub fn login(&self, old_id: &str, user_id: u64) -> Session {
        self.destroy(old_id);
        let mut session = self.start();
        session.user_id = Some(user_id);
        self.sessions.lock().insert(session.id.clone(), session.clone());
        session
    }

    pub fn destroy(&self, id: &str) {
        self.sessions.lock().remove(id);
    }

    /// Drops expired sessions, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

pub fn set_cookie(session: &Session, ttl: Duration) -> String {
    format!("{COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", session.id, ttl.as_secs())
}

pub fn clear_cookie() -> String {
    format!("{COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Loads the caller's [`Session`] into the request extensions.
///
/// Visitors without a live session get an unsaved anonymous one; handlers
/// that need it kept call [`SessionStore::persist`] and set the cookie
/// themselves. A live session's cookie is re-sent on every response so the
/// browser expiry slides with the server-side one.
pub struct SessionLayer {
    pub store: Arc<SessionStore>,
}

impl Middleware for SessionLayer {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture {
        let live = req.cookie(COOKIE).and_then(|id| self.store.get(id));
        let cookie = match live {
            Some(session) => {
                let cookie = set_cookie(&session, self.store.ttl());
                req.insert_extension(session);
                Some(cookie)
            }
            None => {
                req.insert_extension(self.store.anonymous());
                None
            }
        };

        Box::pin(async move {
            let res = next.run(req).await;
            // Handlers that rotate or end the session set their own cookie.
            let handler_set = res
                .headers()
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("set-cookie") && v.starts_with(COOKIE));
            match cookie {
                Some(cookie) if !handler_set => res.with_header("set-cookie", &cookie),
                _ => res,
            }
        })
    }
}
