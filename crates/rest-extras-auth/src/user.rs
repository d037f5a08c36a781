//! Users.
//!
//! A [`User`] is a typed view of an `auth.user` row, and [`CurrentUser`] is
//! who a request is made by. Rows are created through [`create_user`] so the
//! password is always stored hashed.

use serde::Deserialize;
use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::{Manager, Record};

use crate::hashers::make_password;

const fn default_true() -> bool {
    true
}

/// A user row.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// The unique username.
    pub username: String,
    /// The encoded password hash.
    #[serde(default)]
    pub password: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Whether the user may access the admin.
    #[serde(default)]
    pub is_staff: bool,
    /// Whether the user has every permission.
    #[serde(default)]
    pub is_superuser: bool,
    /// Whether the account is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Group primary keys.
    #[serde(default)]
    pub groups: Vec<i64>,
    /// Directly assigned permission primary keys.
    #[serde(default)]
    pub user_permissions: Vec<i64>,
}

impl User {
    /// Reads a user from a stored row.
    pub fn from_record(record: &Record) -> ExtrasResult<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| ExtrasError::SerializationError(format!("Invalid user row: {e}")))
    }

    /// The primary key as a JSON value.
    pub fn pk(&self) -> Value {
        Value::from(self.id)
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// The user a request is made by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CurrentUser {
    /// No credentials were presented.
    #[default]
    Anonymous,
    /// An authenticated user.
    Authenticated(User),
}

impl CurrentUser {
    /// Returns `true` for an authenticated user.
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns the user, if authenticated.
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// Returns `true` for an authenticated staff member.
    pub fn is_staff(&self) -> bool {
        self.user().is_some_and(|u| u.is_staff)
    }

    /// Returns `true` for an authenticated superuser.
    pub fn is_superuser(&self) -> bool {
        self.user().is_some_and(|u| u.is_superuser)
    }

    /// Returns the primary key, if authenticated.
    pub fn pk(&self) -> Option<Value> {
        self.user().map(User::pk)
    }
}

/// Creates a user with a hashed password.
///
/// `extra` may carry any other user fields (`email`, `is_staff`, ...).
pub async fn create_user(
    users: &dyn Manager,
    username: &str,
    password: &str,
    mut extra: Record,
) -> ExtrasResult<User> {
    extra.insert("username".into(), Value::String(username.to_string()));
    extra.insert("password".into(), Value::String(make_password(password).await?));
    let row = users.create(extra).await?;
    User::from_record(&row)
}

/// Creates an active staff superuser.
pub async fn create_superuser(
    users: &dyn Manager,
    username: &str,
    password: &str,
    mut extra: Record,
) -> ExtrasResult<User> {
    extra.insert("is_staff".into(), Value::Bool(true));
    extra.insert("is_superuser".into(), Value::Bool(true));
    create_user(users, username, password, extra).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use rest_extras_db::{InMemoryDatabase, ModelRegistry};

    use super::*;
    use crate::hashers::check_password;
    use crate::models::user_meta;

    #[test]
    fn test_from_record_defaults() {
        let row = json!({"id": 3, "username": "u", "last_login": null});
        let user = User::from_record(row.as_object().unwrap()).unwrap();
        assert_eq!(user.id, 3);
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(user.groups.is_empty());
    }

    #[test]
    fn test_current_user() {
        assert!(!CurrentUser::Anonymous.is_authenticated());
        assert!(!CurrentUser::default().is_staff());
        let row = json!({"id": 1, "username": "s", "is_staff": true});
        let current = CurrentUser::Authenticated(User::from_record(row.as_object().unwrap()).unwrap());
        assert!(current.is_staff());
        assert!(!current.is_superuser());
        assert_eq!(current.pk(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_create_superuser_hashes_password() {
        let db = InMemoryDatabase::new();
        let mut models = ModelRegistry::new();
        models.register(db.model_class(user_meta())).unwrap();
        db.migrate(&models).await.unwrap();
        let users = models.get("auth", "user").unwrap().objects().unwrap().clone();
        let user = create_superuser(users.as_ref(), "root", "password", Record::new())
            .await
            .unwrap();
        assert!(user.is_superuser && user.is_staff && user.is_active);
        assert_ne!(user.password, "password");
        assert!(check_password("password", &user.password).await.unwrap());
    }
}
