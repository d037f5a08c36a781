//! Field type definitions.
//!
//! Each [`FieldType`] variant corresponds to a Django model field type, and
//! [`FieldDef`] captures the metadata the REST and form layers read: nullability,
//! blankness, editability, defaults and relations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// Auto-incrementing integer primary key.
    AutoField,
    /// Variable-length string with a max length.
    CharField {
        /// Maximum length in characters.
        max_length: usize,
    },
    /// Unlimited-length text.
    TextField,
    /// Signed integer.
    IntegerField,
    /// Boolean (true/false).
    BooleanField,
    /// Date and time, stored as an RFC 3339 string.
    DateTimeField,
    /// Email address (a `CharField` with email validation).
    EmailField {
        /// Maximum length in characters.
        max_length: usize,
    },
    /// Arbitrary JSON data.
    JsonField,
    /// Many-to-one relationship, stored as the target's primary key.
    ForeignKey {
        /// The target model key (e.g. `"tests.foo"`).
        to: String,
    },
    /// Many-to-many relationship, stored as a list of target primary keys.
    ManyToManyField {
        /// The target model key (e.g. `"tests.bar"`).
        to: String,
    },
}

impl FieldType {
    /// Returns `true` for types whose empty value is the empty string.
    pub const fn empty_strings_allowed(&self) -> bool {
        matches!(
            self,
            Self::CharField { .. } | Self::TextField | Self::EmailField { .. }
        )
    }
}

/// A field's default value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// A fixed value.
    Value(Value),
    /// The current time, evaluated on every insert.
    Now,
}

impl FieldDefault {
    /// Produces the value to store.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Now => Value::String(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Complete definition of a model field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// The attribute name of this field.
    pub name: String,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed in storage.
    pub null: bool,
    /// Whether the field may be left blank in forms and serializers.
    pub blank: bool,
    /// Default value for new rows.
    pub default: Option<FieldDefault>,
    /// Whether a UNIQUE constraint is applied.
    pub unique: bool,
    /// Whether the field is editable through forms and serializers.
    pub editable: bool,
    /// Human-readable name for the field.
    pub verbose_name: String,
}

impl FieldDef {
    /// Creates a new `FieldDef`: non-null, not blank, editable, no default.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let verbose_name = name.replace('_', " ");
        Self {
            name,
            field_type,
            primary_key: false,
            null: false,
            blank: false,
            default: None,
            unique: false,
            editable: true,
            verbose_name,
        }
    }

    /// Shorthand for a `CharField`.
    pub fn char(name: impl Into<String>, max_length: usize) -> Self {
        Self::new(name, FieldType::CharField { max_length })
    }

    /// Shorthand for a `ForeignKey` to the given model key.
    pub fn foreign_key(name: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(name, FieldType::ForeignKey { to: to.into() })
    }

    /// Shorthand for a `ManyToManyField` to the given model key.
    pub fn many_to_many(name: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(name, FieldType::ManyToManyField { to: to.into() })
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Allows the field to be left blank.
    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Marks this field as having a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Hides this field from forms and makes it read-only in serializers.
    #[must_use]
    pub const fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Sets a fixed default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Defaults to the current time on insert.
    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(FieldDefault::Now);
        self
    }

    /// Returns `true` if this field has an explicit default.
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns `true` if this field is a relation.
    pub const fn is_relation(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::ForeignKey { .. } | FieldType::ManyToManyField { .. }
        )
    }

    /// Returns `true` if this field is a many-to-many relation.
    pub const fn is_many_to_many(&self) -> bool {
        matches!(self.field_type, FieldType::ManyToManyField { .. })
    }

    /// Returns the target model key of a relation.
    pub fn related_model(&self) -> Option<&str> {
        match &self.field_type {
            FieldType::ForeignKey { to } | FieldType::ManyToManyField { to } => Some(to),
            _ => None,
        }
    }

    /// Returns the value used when a row is inserted without this field.
    ///
    /// Mirrors Django's `Field.get_default()`: an explicit default wins, a
    /// many-to-many starts empty, string types fall back to `""` unless they
    /// are nullable, and everything else is NULL.
    pub fn get_default(&self) -> Value {
        if let Some(default) = &self.default {
            return default.resolve();
        }
        if self.is_many_to_many() {
            return Value::Array(Vec::new());
        }
        if self.field_type.empty_strings_allowed() && !self.null {
            return Value::String(String::new());
        }
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let f = FieldDef::char("title", 32);
        assert!(f.editable);
        assert!(!f.null);
        assert!(!f.blank);
        assert_eq!(f.verbose_name, "title");
    }

    #[test]
    fn test_builder_flags() {
        let f = FieldDef::char("non_editable_field", 32).not_editable().unique();
        assert!(!f.editable);
        assert!(f.unique);
    }

    #[test]
    fn test_relation_helpers() {
        let fk = FieldDef::foreign_key("foreign_field", "tests.foo");
        let m2m = FieldDef::many_to_many("many_field", "tests.bar");
        assert!(fk.is_relation());
        assert!(!fk.is_many_to_many());
        assert!(m2m.is_many_to_many());
        assert_eq!(fk.related_model(), Some("tests.foo"));
        assert_eq!(FieldDef::char("x", 1).related_model(), None);
    }

    #[test]
    fn test_get_default() {
        assert_eq!(FieldDef::char("a", 3).get_default(), Value::String(String::new()));
        assert_eq!(FieldDef::char("a", 3).nullable().get_default(), Value::Null);
        assert_eq!(
            FieldDef::new("n", FieldType::IntegerField).get_default(),
            Value::Null
        );
        assert_eq!(
            FieldDef::new("b", FieldType::BooleanField).default(true).get_default(),
            Value::Bool(true)
        );
        assert_eq!(
            FieldDef::many_to_many("m", "tests.bar").get_default(),
            serde_json::json!([])
        );
    }

    #[test]
    fn test_default_now_is_rfc3339() {
        let f = FieldDef::new("date_joined", FieldType::DateTimeField).default_now();
        let value = f.get_default();
        let text = value.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
    }
}
