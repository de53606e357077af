use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "wiki.session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    expires_at: DateTime<Utc>,
}

/// In-memory session table for the web UI.
///
/// Sessions remember who logged in, never what they may do; grants are
/// re-resolved from the realm on every request.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes as i64),
        }
    }

    /// Opens a session; sessions that have already expired are swept out first
    pub async fn create(&self, username: &str) -> SessionId {
        let id = SessionId::generate();
        let now = Utc::now();
        let entry = SessionEntry {
            username: username.to_string(),
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, existing| existing.expires_at > now);
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!("Swept {} expired session(s)", swept);
        }
        sessions.insert(id, entry);
        tracing::debug!("Opened session for '{}'", username);
        id
    }

    /// Username bound to a live session; expired sessions are evicted on lookup
    pub async fn username(&self, id: &SessionId) -> Option<String> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(entry) if entry.expires_at > Utc::now() => return Some(entry.username.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(id);
        None
    }

    pub async fn remove(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// `Set-Cookie` value that binds `id` to the browser
    pub fn cookie(id: &SessionId) -> String {
        format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
    }

    /// `Set-Cookie` value that clears the session cookie
    pub fn expired_cookie() -> String {
        format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE)
    }

    /// Extract the session id from a `Cookie` header value
    pub fn id_from_cookie_header(header: &str) -> Option<SessionId> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| value.parse().ok())
    }
}
