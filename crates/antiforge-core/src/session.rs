//! In-memory sessions
//!
//! [`SessionLayer`] resolves a session from its id cookie, attaches a
//! [`Session`] handle to the request extensions and writes the data back to
//! the store after the handler ran. A new session id cookie is only issued
//! when the handler actually stored something.

use crate::cookies;
use crate::middleware::{BoxedNext, MiddlewareLayer, ResponseFuture};
use crate::request::Request;
use cookie::{Cookie, SameSite};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

type SessionData = HashMap<String, Value>;

#[derive(Default)]
struct SessionInner {
    data: SessionData,
    modified: bool,
}

/// Handle to the current request's session data
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionInner>>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                data,
                modified: false,
            })),
        }
    }

    /// Read and deserialize the value under `key`
    ///
    /// A value of the wrong shape reads as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let value = inner.data.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(key, error = %e, "Ignoring malformed session value");
                None
            }
        }
    }

    /// Store `value` under `key`, replacing the previous value
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.data.insert(key.to_string(), value);
        inner.modified = true;
        Ok(())
    }

    /// Remove the value under `key`
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = inner.data.remove(key);
        if removed.is_some() {
            inner.modified = true;
        }
        removed
    }

    /// Whether the session changed since it was loaded
    pub fn is_modified(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .modified
    }

    fn snapshot(&self) -> SessionData {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("modified", &self.is_modified())
            .finish_non_exhaustive()
    }
}

struct StoredSession {
    data: SessionData,
    last_seen: Instant,
}

impl StoredSession {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() >= ttl
    }
}

/// Session data keyed by session id
///
/// Entries idle for longer than the TTL are treated as absent and dropped.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, StoredSession>>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Default idle lifetime of a session (24 hours)
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Self::DEFAULT_TTL,
        }
    }

    /// Set how long a session may stay idle before it expires
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Load a copy of the session data
    ///
    /// Loading refreshes the idle timer. An expired session is removed.
    pub fn load(&self, id: &str) -> Option<Session> {
        let mut entry = self.sessions.get_mut(id)?;
        if entry.is_expired(self.ttl) {
            drop(entry);
            self.sessions.remove(id);
            tracing::debug!("Session expired");
            return None;
        }

        entry.last_seen = Instant::now();
        Some(Session::from_data(entry.data.clone()))
    }

    /// Persist the session data under `id`
    ///
    /// Expired sessions are pruned first.
    pub fn save(&self, id: &str, session: &Session) {
        self.prune();
        self.sessions.insert(
            id.to_string(),
            StoredSession {
                data: session.snapshot(),
                last_seen: Instant::now(),
            },
        );
    }

    /// Drop the session stored under `id`
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop every expired session
    pub fn prune(&self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, stored| !stored.is_expired(ttl));
    }

    /// Number of stored sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no session
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware attaching a [`Session`] to every request
#[derive(Clone)]
pub struct SessionLayer {
    store: MemorySessionStore,
    cookie_name: Arc<str>,
}

impl SessionLayer {
    /// Default name of the session id cookie
    pub const DEFAULT_COOKIE_NAME: &'static str = "session_id";

    /// Create a layer over `store`
    pub fn new(store: MemorySessionStore) -> Self {
        Self {
            store,
            cookie_name: Arc::from(Self::DEFAULT_COOKIE_NAME),
        }
    }

    /// Create a layer with its own fresh store
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStore::new())
    }

    /// Set the session id cookie name
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Arc::from(name.into());
        self
    }
}

impl MiddlewareLayer for SessionLayer {
    fn call(&self, mut req: Request, next: BoxedNext) -> ResponseFuture {
        let store = self.store.clone();
        let cookie_name = self.cookie_name.clone();

        Box::pin(async move {
            let existing = req
                .cookie(&cookie_name)
                .and_then(|id| store.load(&id).map(|session| (id, session)));

            let (id, session, is_new) = match existing {
                Some((id, session)) => (id, session, false),
                None => (Uuid::new_v4().to_string(), Session::new(), true),
            };

            req.extensions_mut().insert(session.clone());
            let mut response = next(req).await;

            if session.is_modified() {
                store.save(&id, &session);

                if is_new {
                    let cookie = Cookie::build((cookie_name.to_string(), id))
                        .path("/")
                        .http_only(true)
                        .same_site(SameSite::Lax)
                        .build();
                    if let Err(e) = cookies::set(&mut response, &cookie) {
                        tracing::error!(error = %e, "Failed to set session cookie");
                    }
                }
            }

            response
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}
