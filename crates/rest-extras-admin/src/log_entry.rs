//! The admin change log model.

use rest_extras_db::{FieldDef, FieldType, ModelMeta};

/// The `admin.LogEntry` model.
pub fn log_entry_meta() -> ModelMeta {
    ModelMeta::new("admin", "LogEntry")
        .verbose_name("log entry")
        .field(FieldDef::new("action_time", FieldType::DateTimeField).default_now().not_editable())
        .field(FieldDef::foreign_key("user", "auth.user"))
        .field(FieldDef::foreign_key("content_type", "contenttypes.contenttype").nullable().blank())
        .field(FieldDef::new("object_id", FieldType::TextField).nullable().blank())
        .field(FieldDef::char("object_repr", 200))
        .field(FieldDef::new("action_flag", FieldType::IntegerField))
        .field(FieldDef::new("change_message", FieldType::TextField).blank())
}
