//! Model definitions for the `auth`, `contenttypes` and `sessions` apps.

use rest_extras_db::contenttypes::content_type_meta;
use rest_extras_db::{FieldDef, FieldType, ModelMeta};

/// Model key of the user model.
pub const USER_MODEL: &str = "auth.user";
/// Model key of the group model.
pub const GROUP_MODEL: &str = "auth.group";
/// Model key of the permission model.
pub const PERMISSION_MODEL: &str = "auth.permission";
/// Model key of the session model.
pub const SESSION_MODEL: &str = "sessions.session";

fn boolean(name: &str, default: bool) -> FieldDef {
    FieldDef::new(name, FieldType::BooleanField).default(default).blank()
}

/// The `auth.User` model.
pub fn user_meta() -> ModelMeta {
    ModelMeta::new("auth", "User")
        .field(FieldDef::char("password", 128))
        .field(FieldDef::new("last_login", FieldType::DateTimeField).nullable().blank())
        .field(boolean("is_superuser", false))
        .field(FieldDef::char("username", 150).unique())
        .field(FieldDef::char("first_name", 150).blank())
        .field(FieldDef::char("last_name", 150).blank())
        .field(FieldDef::new("email", FieldType::EmailField { max_length: 254 }).blank())
        .field(boolean("is_staff", false))
        .field(boolean("is_active", true))
        .field(FieldDef::new("date_joined", FieldType::DateTimeField).default_now())
        .field(FieldDef::many_to_many("groups", "auth.group").blank())
        .field(FieldDef::many_to_many("user_permissions", "auth.permission").blank())
}

/// The `auth.Group` model.
pub fn group_meta() -> ModelMeta {
    ModelMeta::new("auth", "Group")
        .field(FieldDef::char("name", 150).unique())
        .field(FieldDef::many_to_many("permissions", "auth.permission").blank())
}

/// The `auth.Permission` model.
pub fn permission_meta() -> ModelMeta {
    ModelMeta::new("auth", "Permission")
        .field(FieldDef::char("name", 255))
        .field(FieldDef::foreign_key("content_type", "contenttypes.contenttype"))
        .field(FieldDef::char("codename", 100))
}

/// The `sessions.Session` model.
pub fn session_meta() -> ModelMeta {
    ModelMeta::new("sessions", "Session")
        .field(FieldDef::char("session_key", 40).unique())
        .field(FieldDef::new("session_data", FieldType::TextField))
        .field(FieldDef::new("expire_date", FieldType::DateTimeField))
}

/// Every model of the `auth`, `contenttypes` and `sessions` apps.
pub fn all() -> Vec<ModelMeta> {
    vec![
        permission_meta(),
        group_meta(),
        user_meta(),
        content_type_meta(),
        session_meta(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_fields() {
        let meta = user_meta();
        assert_eq!(meta.model_key(), USER_MODEL);
        assert!(meta.get_field("username").unwrap().unique);
        assert!(meta.get_field("is_active").unwrap().has_default());
        assert!(meta.get_field("groups").unwrap().is_many_to_many());
    }

    #[test]
    fn test_all_keys() {
        let keys: Vec<String> = all().iter().map(ModelMeta::model_key).collect();
        assert_eq!(
            keys,
            vec![
                PERMISSION_MODEL,
                GROUP_MODEL,
                USER_MODEL,
                "contenttypes.contenttype",
                SESSION_MODEL
            ]
        );
    }
}
