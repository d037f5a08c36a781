//! Serializer fields.
//!
//! A [`SerializerField`] describes how one attribute is read from request
//! data and written to a representation. Fields are usually derived from
//! model fields with [`SerializerField::from_model_field`]; declared fields
//! (such as a write-only password) replace them by name.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use rest_extras_db::{FieldDef, FieldType};

use crate::relations::json_type_name;

pub const REQUIRED: &str = "This field is required.";
pub const NULL: &str = "This field may not be null.";
pub const BLANK: &str = "This field may not be blank.";
pub const EMPTY_LIST: &str = "This list may not be empty.";

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// How a field's value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// The row's own detail URL. Always read-only.
    Url,
    Char {
        max_length: Option<usize>,
        allow_blank: bool,
    },
    Email {
        max_length: Option<usize>,
        allow_blank: bool,
    },
    Integer,
    Boolean,
    DateTime,
    Json,
    /// A foreign key, as a hyperlink to the target row.
    Related { to: String },
    /// A many-to-many relation, as a list of hyperlinks.
    ManyRelated { to: String, allow_empty: bool },
}

/// One serializer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerField {
    pub name: String,
    pub kind: FieldKind,
    pub read_only: bool,
    pub write_only: bool,
    pub required: bool,
    pub allow_null: bool,
    /// Checked against existing rows on write.
    pub unique: bool,
}

impl SerializerField {
    /// A required, writable field.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            read_only: false,
            write_only: false,
            required: true,
            allow_null: false,
            unique: false,
        }
    }

    /// The `url` identity field.
    pub fn url() -> Self {
        Self::new("url", FieldKind::Url).read_only()
    }

    /// A free-text field.
    pub fn char(name: impl Into<String>, max_length: Option<usize>, allow_blank: bool) -> Self {
        Self::new(
            name,
            FieldKind::Char {
                max_length,
                allow_blank,
            },
        )
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self.required = false;
        self
    }

    #[must_use]
    pub const fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub const fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Builds the field for a model field. The primary key has none.
    ///
    /// Non-editable fields are read-only. A field is optional when it has a
    /// default, may be blank, or may be null.
    pub fn from_model_field(field: &FieldDef) -> Option<Self> {
        let kind = match &field.field_type {
            FieldType::AutoField => return None,
            FieldType::CharField { max_length } => FieldKind::Char {
                max_length: Some(*max_length),
                allow_blank: field.blank,
            },
            FieldType::TextField => FieldKind::Char {
                max_length: None,
                allow_blank: field.blank,
            },
            FieldType::EmailField { max_length } => FieldKind::Email {
                max_length: Some(*max_length),
                allow_blank: field.blank,
            },
            FieldType::IntegerField => FieldKind::Integer,
            FieldType::BooleanField => FieldKind::Boolean,
            FieldType::DateTimeField => FieldKind::DateTime,
            FieldType::JsonField => FieldKind::Json,
            FieldType::ForeignKey { to } => FieldKind::Related { to: to.clone() },
            FieldType::ManyToManyField { to } => FieldKind::ManyRelated {
                to: to.clone(),
                allow_empty: field.blank,
            },
        };
        if field.primary_key {
            return None;
        }
        let mut out = Self::new(field.name.clone(), kind);
        out.required = if field.is_many_to_many() {
            !field.blank
        } else {
            !(field.has_default() || field.blank || field.null)
        };
        out.allow_null = field.null;
        out.unique = field.unique;
        if !field.editable {
            out = out.read_only();
        }
        Some(out)
    }

    pub const fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Related { .. } | FieldKind::ManyRelated { .. })
    }

    /// The value read from form-encoded data when the field is absent, if
    /// that is not "missing". Unchecked checkboxes mean `false`, and a
    /// many-to-many with no selections is an empty list.
    pub fn html_absent_value(&self, partial: bool) -> Option<Value> {
        if partial {
            return None;
        }
        match self.kind {
            FieldKind::Boolean => Some(Value::Bool(false)),
            FieldKind::ManyRelated { .. } => Some(Value::Array(Vec::new())),
            _ => None,
        }
    }

    /// Converts a non-null value of a non-relational field to its stored form.
    pub fn to_internal_value(&self, value: &Value, html_input: bool) -> Result<Value, String> {
        match &self.kind {
            FieldKind::Char {
                max_length,
                allow_blank,
            } => clean_string(value, *max_length, *allow_blank),
            FieldKind::Email {
                max_length,
                allow_blank,
            } => {
                let cleaned = clean_string(value, *max_length, *allow_blank)?;
                let text = cleaned.as_str().unwrap_or_default();
                let valid = text.is_empty() || EMAIL_RE.as_ref().is_some_and(|re| re.is_match(text));
                if valid {
                    Ok(cleaned)
                } else {
                    Err("Enter a valid email address.".to_string())
                }
            }
            FieldKind::Integer => parse_integer(value)
                .map(Value::from)
                .ok_or_else(|| "A valid integer is required.".to_string()),
            FieldKind::Boolean => parse_boolean(value)
                .map(Value::Bool)
                .ok_or_else(|| "Must be a valid boolean.".to_string()),
            FieldKind::DateTime => parse_datetime(value).ok_or_else(|| {
                "Datetime has wrong format. Use one of these formats instead: \
                 YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z]."
                    .to_string()
            }),
            FieldKind::Json => match value {
                Value::String(text) if html_input => {
                    serde_json::from_str(text).map_err(|_| "Value must be valid JSON.".to_string())
                }
                other => Ok(other.clone()),
            },
            FieldKind::Url | FieldKind::Related { .. } | FieldKind::ManyRelated { .. } => {
                Ok(value.clone())
            }
        }
    }
}

fn clean_string(value: &Value, max_length: Option<usize>, allow_blank: bool) -> Result<Value, String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err("Not a valid string.".to_string()),
    };
    if text.is_empty() {
        return if allow_blank {
            Ok(Value::String(text))
        } else {
            Err(BLANK.to_string())
        };
    }
    if let Some(max) = max_length {
        if text.chars().count() > max {
            return Err(format!(
                "Ensure this field has no more than {max} characters."
            ));
        }
    }
    Ok(Value::String(text))
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .and_then(|f| format!("{f:.0}").parse().ok())
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| {
                s.strip_suffix(".0").and_then(|whole| whole.parse().ok())
            })
        }
        _ => None,
    }
}

fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "true" | "True" | "TRUE" | "t" | "T" | "1" | "on" | "On" | "ON" | "yes" | "Yes" | "YES" | "y" | "Y" => {
                Some(true)
            }
            "false" | "False" | "FALSE" | "f" | "F" | "0" | "off" | "Off" | "OFF" | "no" | "No" | "NO" | "n" | "N" => {
                Some(false)
            }
            _ => None,
        },
        _ => None,
    }
}

fn parse_datetime(value: &Value) -> Option<Value> {
    let text = value.as_str()?.trim();
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| Value::String(dt.with_timezone(&Utc).to_rfc3339()))
}

/// The message for a many-to-many value that is not a list.
pub fn not_a_list(value: &Value) -> String {
    format!(
        "Expected a list of items but got type \"{}\".",
        json_type_name(value)
    )
}
