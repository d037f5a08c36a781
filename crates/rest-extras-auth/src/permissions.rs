//! Model permissions.
//!
//! Every model gets `add_`, `change_` and `delete_` permissions, stored as
//! `auth.permission` rows that point at the model's content type. A
//! permission is referred to as `"app_label.codename"`.

use serde::Deserialize;
use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::{ContentTypeCatalog, ModelMeta, ModelRegistry, Record};

use crate::models::PERMISSION_MODEL;

/// The default actions every model gets a permission for.
pub const DEFAULT_ACTIONS: [&str; 3] = ["add", "change", "delete"];

/// A permission row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Permission {
    /// Primary key.
    pub id: i64,
    /// Human-readable name (e.g. "Can add user").
    pub name: String,
    /// The content type primary key.
    pub content_type: i64,
    /// The codename (e.g. "add_user").
    pub codename: String,
}

impl Permission {
    /// Reads a permission from a stored row.
    pub fn from_record(record: &Record) -> ExtrasResult<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| ExtrasError::SerializationError(format!("Invalid permission row: {e}")))
    }
}

/// Returns the codename for an action on a model (e.g. `"add_vanilla"`).
pub fn get_permission_codename(action: &str, meta: &ModelMeta) -> String {
    format!("{action}_{}", meta.model_name)
}

/// Returns the `(codename, name)` pairs of a model's default permissions.
pub fn default_permissions(meta: &ModelMeta) -> Vec<(String, String)> {
    DEFAULT_ACTIONS
        .iter()
        .map(|action| {
            (
                get_permission_codename(action, meta),
                format!("Can {action} {}", meta.verbose_name),
            )
        })
        .collect()
}

/// Creates the default permissions of every registered model that lacks them.
///
/// Does nothing when the permission model is not registered. Returns the
/// number of permissions created.
pub async fn create_permissions(models: &ModelRegistry, catalog: &ContentTypeCatalog) -> ExtrasResult<usize> {
    let Some(permissions) = models.get_by_key(PERMISSION_MODEL).and_then(|m| m.objects()) else {
        return Ok(0);
    };
    let existing: Vec<Permission> = permissions
        .all()
        .await?
        .iter()
        .map(Permission::from_record)
        .collect::<ExtrasResult<_>>()?;

    let mut created = 0;
    for class in models.all() {
        let ct = catalog.get_for_model(&class.meta).await?;
        for (codename, name) in default_permissions(&class.meta) {
            let known = existing
                .iter()
                .any(|p| p.content_type == ct.id && p.codename == codename);
            if known {
                continue;
            }
            let mut row = Record::new();
            row.insert("name".into(), Value::String(name));
            row.insert("content_type".into(), Value::from(ct.id));
            row.insert("codename".into(), Value::String(codename));
            permissions.create(row).await?;
            created += 1;
        }
    }
    tracing::debug!(created, "created permissions");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_permissions() {
        let meta = ModelMeta::new("tests", "Vanilla");
        let perms = default_permissions(&meta);
        assert_eq!(
            perms,
            vec![
                ("add_vanilla".to_string(), "Can add vanilla".to_string()),
                ("change_vanilla".to_string(), "Can change vanilla".to_string()),
                ("delete_vanilla".to_string(), "Can delete vanilla".to_string()),
            ]
        );
    }
}
