//! Model metadata.
//!
//! [`ModelMeta`] is the equivalent of a Django model class plus its `Meta`:
//! identity (`app_label`, `model_name`), fields and abstractness. Concrete
//! models get an implicit `id` primary key, and can copy the fields of an
//! abstract base with [`ModelMeta::extends`].

use crate::fields::{FieldDef, FieldType};

/// Metadata about a model.
///
/// # Examples
///
/// ```
/// use rest_extras_db::fields::FieldDef;
/// use rest_extras_db::model::ModelMeta;
///
/// let base = ModelMeta::new_abstract("tests", "Base").field(FieldDef::char("title", 32));
/// let meta = ModelMeta::new("tests", "Vanilla").extends(&base);
///
/// assert_eq!(meta.model_name, "vanilla");
/// assert_eq!(meta.model_key(), "tests.vanilla");
/// assert_eq!(meta.route_path(), "tests-vanilla");
/// assert_eq!(meta.field_names(), vec!["id", "title"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
    /// The application label (e.g. "auth", "tests").
    pub app_label: String,
    /// The model name in lowercase (e.g. "user", "withform").
    pub model_name: String,
    /// The class-style name (e.g. "User", "WithForm").
    pub object_name: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Whether this is an abstract model (no table, no content type).
    pub abstract_model: bool,
    /// Field definitions, in declaration order.
    pub fields: Vec<FieldDef>,
}

impl ModelMeta {
    /// Creates a concrete model with an implicit `id` auto primary key.
    pub fn new(app_label: impl Into<String>, object_name: impl Into<String>) -> Self {
        let mut meta = Self::new_abstract(app_label, object_name);
        meta.abstract_model = false;
        meta.fields
            .push(FieldDef::new("id", FieldType::AutoField).primary_key());
        meta
    }

    /// Creates an abstract model with no fields.
    pub fn new_abstract(app_label: impl Into<String>, object_name: impl Into<String>) -> Self {
        let object_name = object_name.into();
        let model_name = object_name.to_lowercase();
        Self {
            app_label: app_label.into(),
            verbose_name: model_name.clone(),
            model_name,
            object_name,
            abstract_model: true,
            fields: Vec::new(),
        }
    }

    /// Appends a field definition.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the verbose name.
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Copies the fields of an abstract base, after any fields already present.
    pub fn extends(mut self, base: &Self) -> Self {
        for field in &base.fields {
            if self.get_field(&field.name).is_none() {
                self.fields.push(field.clone());
            }
        }
        self
    }

    /// Returns `"app_label.model_name"`, the key used for registries and relations.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Returns `"app_label-model_name"`, the route path generated for this model.
    pub fn route_path(&self) -> String {
        format!("{}-{}", self.app_label, self.model_name)
    }

    /// Returns the storage table name (`app_label_model_name`).
    pub fn db_table(&self) -> String {
        format!("{}_{}", self.app_label, self.model_name)
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field, if any.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Returns the name of the primary key field, defaulting to `"id"`.
    pub fn pk_name(&self) -> &str {
        self.pk_field().map_or("id", |f| f.name.as_str())
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns the editable, non-primary-key fields.
    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.editable && !f.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ModelMeta {
        ModelMeta::new_abstract("tests", "Base")
            .field(FieldDef::char("editable_field", 32))
            .field(FieldDef::char("non_editable_field", 32).not_editable())
            .field(FieldDef::foreign_key("foreign_field", "tests.foo"))
    }

    #[test]
    fn test_new_has_auto_pk() {
        let meta = ModelMeta::new("tests", "Bar");
        assert!(!meta.abstract_model);
        assert_eq!(meta.pk_name(), "id");
        assert_eq!(meta.pk_field().unwrap().field_type, FieldType::AutoField);
    }

    #[test]
    fn test_abstract_has_no_fields() {
        let meta = ModelMeta::new_abstract("tests", "Base");
        assert!(meta.abstract_model);
        assert!(meta.fields.is_empty());
    }

    #[test]
    fn test_extends_copies_fields_in_order() {
        let meta = ModelMeta::new("tests", "WithForm").extends(&base());
        assert_eq!(
            meta.field_names(),
            vec!["id", "editable_field", "non_editable_field", "foreign_field"]
        );
        assert_eq!(meta.model_name, "withform");
        assert_eq!(meta.object_name, "WithForm");
    }

    #[test]
    fn test_editable_fields_skip_pk_and_non_editable() {
        let meta = ModelMeta::new("tests", "Vanilla").extends(&base());
        let names: Vec<&str> = meta.editable_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["editable_field", "foreign_field"]);
    }

    #[test]
    fn test_keys() {
        let meta = ModelMeta::new("auth", "User");
        assert_eq!(meta.model_key(), "auth.user");
        assert_eq!(meta.route_path(), "auth-user");
        assert_eq!(meta.db_table(), "auth_user");
    }
}
