//! Role-dependent user serializers.
//!
//! What a caller sees of a user, and may change, depends on who they are:
//!
//! | Role | Fields |
//! |---|---|
//! | superuser | every user field |
//! | staff | `username`, `first_name`, `last_name`, `email`, `is_staff` |
//! | user | `username`, `first_name`, `last_name`, `email` |
//!
//! Every role may also send a write-only `password`, which is stored hashed
//! and never rendered.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use rest_extras_auth::{make_password, CurrentUser};
use rest_extras_core::ExtrasResult;
use rest_extras_db::{Manager, ModelMeta, Record};

use crate::request::RequestData;
use crate::serializers::{ModelSerializer, Serializer, SerializerContext, SerializerField, SerializerOptions};

const STAFF_FIELDS: [&str; 6] = ["username", "first_name", "last_name", "email", "is_staff", "password"];
const USER_FIELDS: [&str; 5] = ["username", "first_name", "last_name", "email", "password"];

/// The caller's role, decided per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperUser,
    Staff,
    User,
}

impl Role {
    pub fn for_user(user: &CurrentUser) -> Self {
        if user.is_superuser() {
            Self::SuperUser
        } else if user.is_staff() {
            Self::Staff
        } else {
            Self::User
        }
    }

    pub const fn serializer_name(self) -> &'static str {
        match self {
            Self::SuperUser => "UserSerializerForSuperUser",
            Self::Staff => "UserSerializerForStaff",
            Self::User => "UserSerializerForUser",
        }
    }

    pub fn options(self) -> SerializerOptions {
        let password = SerializerField::char("password", None, true).write_only();
        let options = SerializerOptions::new(self.serializer_name()).declare(password);
        match self {
            Self::SuperUser => options,
            Self::Staff => options.only(&STAFF_FIELDS),
            Self::User => options.only(&USER_FIELDS),
        }
    }
}

/// A user serializer for one role.
#[derive(Debug)]
pub struct UserSerializer {
    role: Role,
    inner: ModelSerializer,
}

impl UserSerializer {
    pub fn new(
        role: Role,
        meta: Arc<ModelMeta>,
        manager: Arc<dyn Manager>,
        context: SerializerContext,
        instance: Option<Record>,
    ) -> ExtrasResult<Self> {
        let inner = ModelSerializer::new(meta, manager, &role.options(), context)?.with_instance(instance);
        Ok(Self { role, inner })
    }

    pub const fn role(&self) -> Role {
        self.role
    }
}

#[async_trait]
impl Serializer for UserSerializer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fields(&self) -> &[SerializerField] {
        self.inner.fields()
    }

    fn instance(&self) -> Option<&Record> {
        self.inner.instance()
    }

    async fn run_validation(&mut self, data: &RequestData) -> ExtrasResult<Record> {
        self.inner.run_validation(data).await
    }

    /// Hashes the password before storing. An empty password on update
    /// leaves the current one in place.
    async fn save(&mut self, mut validated: Record) -> ExtrasResult<Record> {
        let creating = self.inner.instance().is_none();
        if let Some(password) = validated.remove("password") {
            let raw = password.as_str().unwrap_or_default();
            if creating || !raw.is_empty() {
                validated.insert("password".to_string(), Value::String(make_password(raw).await?));
            }
        }
        self.inner.save(validated).await
    }

    fn to_representation(&self, instance: &Record) -> Value {
        self.inner.to_representation(instance)
    }
}

#[cfg(test)]
mod tests {
    use rest_extras_auth::models::user_meta;
    use rest_extras_auth::User;

    use super::*;

    fn names(role: Role) -> Vec<String> {
        role.options()
            .build_fields(&user_meta())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect()
    }

    #[test]
    fn test_role_for_user() {
        let user = |is_staff, is_superuser| {
            CurrentUser::Authenticated(User {
                id: 1,
                username: "u".into(),
                password: String::new(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                is_staff,
                is_superuser,
                is_active: true,
                groups: Vec::new(),
                user_permissions: Vec::new(),
            })
        };
        assert_eq!(Role::for_user(&user(true, true)), Role::SuperUser);
        assert_eq!(Role::for_user(&user(true, false)), Role::Staff);
        assert_eq!(Role::for_user(&user(false, false)), Role::User);
        assert_eq!(Role::for_user(&CurrentUser::Anonymous), Role::User);
    }

    #[test]
    fn test_field_sets() {
        assert_eq!(names(Role::Staff), STAFF_FIELDS);
        assert_eq!(names(Role::User), USER_FIELDS);
        let all = names(Role::SuperUser);
        assert_eq!(all[0], "url");
        for name in ["password", "is_superuser", "is_active", "date_joined", "groups"] {
            assert!(all.iter().any(|n| n == name), "missing {name}");
        }

        let fields = Role::SuperUser.options().build_fields(&user_meta()).unwrap();
        let password = fields.iter().find(|f| f.name == "password").unwrap();
        assert!(password.write_only);
        assert!(password.required);
    }
}
