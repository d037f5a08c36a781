//! Session-based login state.
//!
//! [`SessionStore`] maps random session keys to the logged-in user. Each
//! session also records a fingerprint of the user's password hash, so a
//! password change invalidates existing sessions.

use std::collections::HashMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tokio::sync::RwLock;

use rest_extras_core::ExtrasResult;

use crate::backends::ModelBackend;
use crate::user::User;

/// Length of generated session keys.
const SESSION_KEY_LENGTH: usize = 32;

/// What a session remembers about its user.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionData {
    user_id: i64,
    auth_hash: String,
}

/// Uses the first 40 characters of the password hash as a fingerprint.
fn session_auth_hash(password_hash: &str) -> String {
    password_hash.chars().take(40).collect()
}

fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// In-memory session store. Clones share the same sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for the user and returns its key.
    pub async fn login(&self, user: &User) -> String {
        let key = generate_key();
        let data = SessionData {
            user_id: user.id,
            auth_hash: session_auth_hash(&user.password),
        };
        self.sessions.write().await.insert(key.clone(), data);
        tracing::debug!(user = %user.username, "session started");
        key
    }

    /// Ends a session. Unknown keys are ignored.
    pub async fn logout(&self, key: &str) {
        self.sessions.write().await.remove(key);
    }

    /// Returns `true` if the key names a live session.
    pub async fn exists(&self, key: &str) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    /// Resolves a session key to its user.
    ///
    /// Sessions of deleted or inactive users, and sessions started before a
    /// password change, resolve to `None`.
    pub async fn get_user(&self, key: &str, backend: &ModelBackend) -> ExtrasResult<Option<User>> {
        let Some(data) = self.sessions.read().await.get(key).cloned() else {
            return Ok(None);
        };
        let Some(user) = backend.get_user(&Value::from(data.user_id)).await? else {
            self.logout(key).await;
            return Ok(None);
        };
        if !user.is_active || session_auth_hash(&user.password) != data.auth_hash {
            self.logout(key).await;
            return Ok(None);
        }
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use rest_extras_db::{ContentTypeCatalog, InMemoryDatabase, ModelRegistry, Record};

    use super::*;
    use crate::hashers::make_password;
    use crate::management::migrate;
    use crate::models;
    use crate::user::create_user;

    #[test]
    fn test_generate_key() {
        let a = generate_key();
        assert_eq!(a.len(), SESSION_KEY_LENGTH);
        assert_ne!(a, generate_key());
    }

    #[tokio::test]
    async fn test_login_resolve_logout() {
        let db = InMemoryDatabase::new();
        let mut registry = ModelRegistry::new();
        for meta in models::all() {
            registry.register(db.model_class(meta)).unwrap();
        }
        migrate(&db, &registry).await.unwrap();
        let backend = ModelBackend::new(Arc::new(registry), ContentTypeCatalog::new(db));
        let users = backend.users().unwrap().clone();
        let user = create_user(users.as_ref(), "user", "password", Record::new())
            .await
            .unwrap();

        let store = SessionStore::new();
        let key = store.login(&user).await;
        assert_eq!(store.get_user(&key, &backend).await.unwrap(), Some(user.clone()));

        // A password change invalidates the session.
        let mut change = Record::new();
        change.insert("password".into(), json!(make_password("other").await.unwrap()));
        users.update(&user.pk(), change).await.unwrap();
        assert_eq!(store.get_user(&key, &backend).await.unwrap(), None);
        assert!(!store.exists(&key).await);

        let key = store.login(&backend.get_user(&user.pk()).await.unwrap().unwrap()).await;
        store.logout(&key).await;
        assert_eq!(store.get_user(&key, &backend).await.unwrap(), None);
    }
}
