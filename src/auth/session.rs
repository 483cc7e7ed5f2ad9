use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::types::{Claims, ROLE_ANONYMOUS_USER};

const HANDLE_BYTES: usize = 16;

/// Upper bound on any session lifetime.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Opaque session identifier carried by the transport (a cookie, for HTTP).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// A fresh random handle.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; HANDLE_BYTES];
        rand::thread_rng().fill(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accepts only values shaped like a generated handle.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == HANDLE_BYTES * 2
            && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep handles out of logs.
impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionHandle({}..)", &self.0[..4.min(self.0.len())])
    }
}

/// Binds verified claims to session handles.
pub trait SessionManager: Send + Sync {
    /// Binds `claims` to `handle`, or clears the session when `None`.
    fn set_claims(&self, handle: &SessionHandle, claims: Option<Claims>);

    fn get_claims(&self, handle: &SessionHandle) -> Option<Claims>;

    fn has_valid_session(&self, handle: &SessionHandle) -> bool {
        self.get_claims(handle).is_some()
    }
}

struct SessionEntry {
    claims: Claims,
    expires_at: Instant,
}

/// In-process session store with a fixed time-to-live per entry.
///
/// Anonymous sessions get their own, usually shorter, lifetime. Both are
/// capped at [`MAX_SESSION_TTL`].
pub struct MemorySessionStore {
    ttl: Duration,
    anonymous_ttl: Duration,
    sessions: Mutex<HashMap<SessionHandle, SessionEntry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let ttl = ttl.min(MAX_SESSION_TTL);
        Self {
            ttl,
            anonymous_ttl: ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_anonymous_ttl(mut self, ttl: Duration) -> Self {
        self.anonymous_ttl = ttl.min(MAX_SESSION_TTL);
        self
    }

    fn ttl_for(&self, claims: &Claims) -> Duration {
        if claims.principal.role == ROLE_ANONYMOUS_USER {
            self.anonymous_ttl
        } else {
            self.ttl
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionHandle, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionManager for MemorySessionStore {
    fn set_claims(&self, handle: &SessionHandle, claims: Option<Claims>) {
        let mut sessions = self.sessions();
        match claims {
            Some(claims) => {
                let now = Instant::now();
                let expires_at = now.checked_add(self.ttl_for(&claims)).unwrap_or(now);
                sessions.insert(handle.clone(), SessionEntry { claims, expires_at });
            }
            None => {
                sessions.remove(handle);
            }
        }
    }

    fn get_claims(&self, handle: &SessionHandle) -> Option<Claims> {
        let mut sessions = self.sessions();
        match sessions.get(handle) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.claims.clone()),
            Some(_) => {
                sessions.remove(handle);
                None
            }
            None => None,
        }
    }
}
