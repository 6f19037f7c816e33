//! Session store: durable persistence of the authenticated identity.
//!
//! Identities arrive from the auth boundary (`/auth/login`,
//! `/auth/register`) and are persisted under the `user` and `userId`
//! entries with a fixed attribute set mirroring the service's cookie
//! policy: path `/`, 86400-second expiry, SameSite Strict, and the secure
//! flag only when the API itself is reached over a secure transport.
//!
//! Rehydration is self-healing: a corrupt or expired persisted session
//! clears itself and yields logged-out, never a startup error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::User;
use crate::storage::Storage;
use crate::transport::Transport;

pub const USER_ENTRY: &str = "user";
pub const USER_ID_ENTRY: &str = "userId";

const SESSION_MAX_AGE_SECS: i64 = 86_400;

/// Attribute set recorded alongside the persisted identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    pub path: String,
    pub max_age: i64,
    pub same_site: SameSite,
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    user: User,
    stored_at: DateTime<Utc>,
    attributes: CookieAttributes,
}

pub struct SessionStore<'a> {
    transport: &'a dyn Transport,
    storage: Storage,
    secure_transport: bool,
    user: Option<User>,
}

impl<'a> SessionStore<'a> {
    /// Open the store and rehydrate any persisted identity.
    pub fn open(transport: &'a dyn Transport, storage: Storage, secure_transport: bool) -> Self {
        let user = rehydrate(&storage);
        Self {
            transport,
            storage,
            secure_transport,
            user,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        let body = json!({"email": email, "password": password});
        let user = self.authenticate("/auth/login", &body).await?;
        self.persist(&user);
        self.user = Some(user.clone());
        Ok(user)
    }

    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> Result<User> {
        let body = json!({"username": username, "email": email, "password": password});
        let user = self.authenticate("/auth/register", &body).await?;
        self.persist(&user);
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Clear the session. Safe to call repeatedly, logged in or not.
    pub fn logout(&mut self) {
        self.user = None;
        self.storage.remove(USER_ENTRY);
        self.storage.remove(USER_ID_ENTRY);
    }

    async fn authenticate(&self, path: &str, body: &Value) -> Result<User> {
        let resp = self.transport.post_json(path, body).await?;
        if !resp.is_success() {
            return Err(Error::Remote {
                status: resp.status,
                message: resp.error_message("error"),
            });
        }
        let payload = resp.json()?;
        let results = payload
            .get("results")
            .ok_or_else(|| Error::Shape("auth response missing results".to_string()))?;
        serde_json::from_value(results.clone())
            .map_err(|e| Error::Shape(format!("malformed user record: {}", e)))
    }

    /// Persistence is best-effort: the login itself already succeeded, so
    /// a write failure only costs rehydration on the next start.
    fn persist(&self, user: &User) {
        let record = PersistedSession {
            user: user.clone(),
            stored_at: Utc::now(),
            attributes: CookieAttributes {
                path: "/".to_string(),
                max_age: SESSION_MAX_AGE_SECS,
                same_site: SameSite::Strict,
                secure: self.secure_transport,
            },
        };
        match serde_json::to_string(&record) {
            Ok(encoded) => {
                if let Err(err) = self.storage.write(USER_ENTRY, &encoded) {
                    warn!(error = %err, "failed to persist session");
                }
                if let Err(err) = self.storage.write(USER_ID_ENTRY, &user.user_id) {
                    warn!(error = %err, "failed to persist user id");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode session"),
        }
    }
}

/// Load the persisted identity, clearing it when it is corrupt or past
/// its expiry window.
fn rehydrate(storage: &Storage) -> Option<User> {
    let raw = storage.read(USER_ENTRY)?;
    let record: PersistedSession = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, "persisted session is corrupt, clearing");
            storage.remove(USER_ENTRY);
            storage.remove(USER_ID_ENTRY);
            return None;
        }
    };

    let age = Utc::now().signed_duration_since(record.stored_at);
    if age.num_seconds() >= record.attributes.max_age {
        storage.remove(USER_ENTRY);
        storage.remove(USER_ID_ENTRY);
        return None;
    }

    Some(record.user)
}
