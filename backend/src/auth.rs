//! Accounts and Sessions
//!
//! Salted password hashing plus an in-process session table keyed by an
//! opaque cookie token.

use crate::store::{StoreError, User, UserRepository};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "career_session";

const HASH_SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials. Please try again.")]
    InvalidCredentials,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================
// PASSWORD HASHING
// ============================================================

/// Hash a password as `sha256$<salt hex>$<digest hex>`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{}${}${}",
        HASH_SCHEME,
        hex::encode(salt),
        hex::encode(digest(&salt, password))
    )
}

/// Check a password against a stored hash. Unknown formats never verify.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt_hex), Some(digest_hex)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    let actual = digest(&salt, password);
    // Compare without short-circuiting on the first differing byte
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

// ============================================================
// ACCOUNTS
// ============================================================

/// Register a new account
pub fn register(
    users: &dyn UserRepository,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() {
        return Err(AuthError::MissingField("username"));
    }
    if email.is_empty() {
        return Err(AuthError::MissingField("email"));
    }
    if password.is_empty() {
        return Err(AuthError::MissingField("password"));
    }

    Ok(users.create_user(username, email, &hash_password(password))?)
}

/// Check credentials and return the matching user
pub fn authenticate(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    match users.find_user_by_email(email.trim())? {
        Some(user) if verify_password(&user.password_hash, password) => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}

// ============================================================
// SESSIONS
// ============================================================

/// The logged-in identity attached to a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
}

/// How long a session stays valid after login
pub const SESSION_TTL_HOURS: i64 = 24;

struct Session {
    user: SessionUser,
    created_at: DateTime<Utc>,
}

/// In-memory session table; expired entries are swept on lookup
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::hours(SESSION_TTL_HOURS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a session and return its token
    pub fn create(&self, user: &User) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            user: SessionUser {
                user_id: user.id,
                username: user.username.clone(),
            },
            created_at: Utc::now(),
        };
        self.lock().insert(token.clone(), session);
        token
    }

    pub fn get(&self, token: &str) -> Option<SessionUser> {
        let cutoff = Utc::now() - self.ttl;
        let mut sessions = self.lock();
        sessions.retain(|_, session| session.created_at > cutoff);
        sessions.get(token).map(|session| session.user.clone())
    }

    /// End a session; returns whether it existed
    pub fn remove(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Sessions currently held, expired ones included until the next lookup
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("s3cret");
        assert!(hash.starts_with("sha256$"));
        assert!(verify_password(&hash, "s3cret"));
        assert!(!verify_password(&hash, "s3cret "));
    }

    #[test]
    fn test_same_password_different_salt() {
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("", "pw"));
        assert!(!verify_password("md5$00$00", "pw"));
        assert!(!verify_password("sha256$zz$zz", "pw"));
    }

    #[test]
    fn test_register_then_authenticate() {
        let store = SqliteStore::in_memory().unwrap();
        let user = register(&store, " priya ", "priya@example.com", "pw").unwrap();
        assert_eq!(user.username, "priya");

        let logged_in = authenticate(&store, "priya@example.com", "pw").unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            authenticate(&store, "priya@example.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&store, "ghost@example.com", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_register_requires_fields() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            register(&store, "", "a@example.com", "pw"),
            Err(AuthError::MissingField("username"))
        ));
        assert!(matches!(
            register(&store, "a", "a@example.com", ""),
            Err(AuthError::MissingField("password"))
        ));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SqliteStore::in_memory().unwrap();
        let user = register(&store, "lee", "lee@example.com", "pw").unwrap();
        let sessions = SessionStore::new();

        let token = sessions.create(&user);
        assert_eq!(sessions.get(&token).unwrap().user_id, user.id);
        assert!(sessions.remove(&token));
        assert!(sessions.get(&token).is_none());
        assert!(!sessions.remove(&token));
    }

    #[test]
    fn test_expired_sessions_are_swept() {
        let store = SqliteStore::in_memory().unwrap();
        let user = register(&store, "sam", "sam@example.com", "pw").unwrap();
        let sessions = SessionStore::with_ttl(Duration::zero());

        let first = sessions.create(&user);
        let second = sessions.create(&user);
        assert_eq!(sessions.len(), 2);

        assert!(sessions.get(&first).is_none());
        assert!(sessions.get(&second).is_none());
        assert!(sessions.is_empty());
    }
}
