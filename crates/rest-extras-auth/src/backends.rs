//! The model authentication backend.
//!
//! [`ModelBackend`] authenticates against `auth.user` rows and answers
//! permission questions from `auth.permission`, `auth.group` and the
//! content-type catalog.
//!
//! Permission rules:
//! - inactive users have no permissions
//! - active superusers have every permission
//! - everyone else has the union of their own and their groups' permissions
//! - object-level permissions are only granted to superusers

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::{ContentTypeCatalog, Manager, ModelRegistry, Record};

use crate::hashers::check_password;
use crate::models::{GROUP_MODEL, PERMISSION_MODEL, USER_MODEL};
use crate::permissions::Permission;
use crate::user::User;

/// Authenticates users and checks their permissions against stored rows.
#[derive(Debug, Clone)]
pub struct ModelBackend {
    models: Arc<ModelRegistry>,
    catalog: ContentTypeCatalog,
}

impl ModelBackend {
    /// Creates a backend over the given models and catalog.
    pub const fn new(models: Arc<ModelRegistry>, catalog: ContentTypeCatalog) -> Self {
        Self { models, catalog }
    }

    fn manager(&self, key: &str) -> ExtrasResult<&Arc<dyn Manager>> {
        self.models
            .get_by_key(key)
            .and_then(|m| m.objects())
            .ok_or_else(|| ExtrasError::ImproperlyConfigured(format!("Model '{key}' is not installed")))
    }

    /// Returns the user manager.
    pub fn users(&self) -> ExtrasResult<&Arc<dyn Manager>> {
        self.manager(USER_MODEL)
    }

    /// Checks a username and password.
    ///
    /// Returns `None` for unknown users, wrong passwords and inactive users.
    pub async fn authenticate(&self, username: &str, password: &str) -> ExtrasResult<Option<User>> {
        let rows = self
            .users()?
            .filter("username", &Value::String(username.to_string()))
            .await?;
        let Some(row) = rows.first() else {
            tracing::debug!(username, "authentication failed: unknown user");
            return Ok(None);
        };
        let user = User::from_record(row)?;
        if !check_password(password, &user.password).await? {
            tracing::debug!(username, "authentication failed: bad password");
            return Ok(None);
        }
        if !user.is_active {
            tracing::debug!(username, "authentication failed: inactive user");
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Loads a user by primary key.
    pub async fn get_user(&self, pk: &Value) -> ExtrasResult<Option<User>> {
        match self.users()?.get(pk).await {
            Ok(row) => User::from_record(&row).map(Some),
            Err(ExtrasError::DoesNotExist(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn permission_names(&self, ids: &HashSet<i64>) -> ExtrasResult<HashSet<String>> {
        let mut names = HashSet::new();
        if ids.is_empty() {
            return Ok(names);
        }
        for row in self.manager(PERMISSION_MODEL)?.all().await? {
            let perm = Permission::from_record(&row)?;
            if ids.contains(&perm.id) {
                let ct = self.catalog.get_for_id(perm.content_type).await?;
                names.insert(format!("{}.{}", ct.app_label, perm.codename));
            }
        }
        Ok(names)
    }

    fn pk_list(row: &Record, field: &str) -> Vec<i64> {
        row.get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }

    /// Returns the user's own permissions as `"app_label.codename"` strings.
    pub async fn get_user_permissions(&self, user: &User) -> ExtrasResult<HashSet<String>> {
        if !user.is_active {
            return Ok(HashSet::new());
        }
        self.permission_names(&user.user_permissions.iter().copied().collect())
            .await
    }

    /// Returns the permissions the user has through their groups.
    pub async fn get_group_permissions(&self, user: &User) -> ExtrasResult<HashSet<String>> {
        if !user.is_active || user.groups.is_empty() {
            return Ok(HashSet::new());
        }
        let groups = self.manager(GROUP_MODEL)?;
        let mut ids = HashSet::new();
        for group in &user.groups {
            if let Ok(row) = groups.get(&Value::from(*group)).await {
                ids.extend(Self::pk_list(&row, "permissions"));
            }
        }
        self.permission_names(&ids).await
    }

    /// Returns every permission of the user, direct and through groups.
    pub async fn get_all_permissions(&self, user: &User) -> ExtrasResult<HashSet<String>> {
        let mut perms = self.get_user_permissions(user).await?;
        perms.extend(self.get_group_permissions(user).await?);
        Ok(perms)
    }

    /// Checks one permission.
    ///
    /// With an object, only active superusers pass.
    pub async fn has_perm(&self, user: &User, perm: &str, obj: Option<&Record>) -> ExtrasResult<bool> {
        if !user.is_active {
            return Ok(false);
        }
        if user.is_superuser {
            return Ok(true);
        }
        if obj.is_some() {
            return Ok(false);
        }
        Ok(self.get_all_permissions(user).await?.contains(perm))
    }

    /// Checks that the user has every one of the given permissions.
    pub async fn has_perms(&self, user: &User, perms: &[String], obj: Option<&Record>) -> ExtrasResult<bool> {
        if !user.is_active {
            return Ok(false);
        }
        if user.is_superuser {
            return Ok(true);
        }
        if obj.is_some() {
            return Ok(perms.is_empty());
        }
        let all = self.get_all_permissions(user).await?;
        Ok(perms.iter().all(|p| all.contains(p)))
    }
}
