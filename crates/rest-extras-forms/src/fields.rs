//! Form field definitions and type-level cleaning.
//!
//! Each [`FormFieldDef`] describes a single form field: its type, whether it
//! is required, and any custom error messages. [`clean_field_value`] performs
//! the type coercion and built-in validation for one field, producing either
//! the cleaned JSON value or the list of error messages Django would report.
//!
//! Relation fields only check the shape of their input here; whether the
//! referenced rows exist is checked by [`validation`](crate::validation),
//! which has access to the model registry.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use rest_extras_db::manager::normalize_pk;

/// The canonical message for a missing required value.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// The message for a single-choice value that is not a valid choice.
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").ok());

/// Defines the type of a form field, including type-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFieldType {
    /// A character (string) field.
    Char {
        /// Maximum length (characters).
        max_length: Option<usize>,
        /// Whether to strip leading/trailing whitespace.
        strip: bool,
    },
    /// An integer field.
    Integer {
        /// Minimum allowed value.
        min_value: Option<i64>,
        /// Maximum allowed value.
        max_value: Option<i64>,
    },
    /// A boolean field. Required booleans must be `true`.
    Boolean,
    /// An email address field.
    Email {
        /// Maximum length (characters).
        max_length: Option<usize>,
    },
    /// A date-time field, cleaned to an RFC 3339 string.
    DateTime,
    /// A JSON field.
    Json,
    /// A choice among the rows of a model, identified by primary key.
    ModelChoice {
        /// The target model key (e.g. `"tests.foo"`).
        to: String,
    },
    /// Several choices among the rows of a model, as a list of primary keys.
    ModelMultipleChoice {
        /// The target model key (e.g. `"tests.bar"`).
        to: String,
    },
}

impl FormFieldType {
    /// Returns the target model key for relation fields.
    pub fn related_model(&self) -> Option<&str> {
        match self {
            Self::ModelChoice { to } | Self::ModelMultipleChoice { to } => Some(to),
            _ => None,
        }
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldDef {
    /// The field name.
    pub name: String,
    /// The field type, controlling parsing and coercion.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default/initial value.
    pub initial: Option<Value>,
    /// Human-readable label.
    pub label: String,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Custom error messages keyed by error code.
    pub error_messages: HashMap<String, String>,
    /// Whether the field is disabled. Disabled fields keep their initial value.
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a new required `FormFieldDef`.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            label,
            help_text: String::new(),
            error_messages: HashMap::new(),
            disabled: false,
        }
    }

    /// Shorthand for an integer field without bounds.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FormFieldType::Integer {
                min_value: None,
                max_value: None,
            },
        )
    }

    /// Shorthand for a stripped char field.
    pub fn char(name: impl Into<String>, max_length: Option<usize>) -> Self {
        Self::new(
            name,
            FormFieldType::Char {
                max_length,
                strip: true,
            },
        )
    }

    /// Sets whether this field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets a custom error message for a given code.
    #[must_use]
    pub fn error_message(mut self, code: impl Into<String>, msg: impl Into<String>) -> Self {
        self.error_messages.insert(code.into(), msg.into());
        self
    }

    /// Sets whether this field is disabled.
    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn message(&self, code: &str, default: &str) -> String {
        self.error_messages
            .get(code)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// The value a non-required field cleans to when left empty.
    fn empty_value(&self) -> Value {
        if let Some(initial) = &self.initial {
            return initial.clone();
        }
        match self.field_type {
            FormFieldType::Char { .. } | FormFieldType::Email { .. } => {
                Value::String(String::new())
            }
            FormFieldType::Boolean => Value::Bool(false),
            FormFieldType::ModelMultipleChoice { .. } => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }
}

/// Returns `true` for Django's empty values: missing, null, `""`, `[]` and `{}`.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Renders a scalar as the text a form would have received.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        _ => None,
    }
}

fn check_max_length(field: &FormFieldDef, text: &str, max: Option<usize>, errors: &mut Vec<String>) {
    if let Some(max) = max {
        let len = text.chars().count();
        if len > max {
            errors.push(field.message(
                "max_length",
                &format!("Ensure this value has at most {max} characters (it has {len})."),
            ));
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !matches!(s.to_lowercase().as_str(), "" | "false" | "0"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn parse_datetime(text: &str) -> Option<String> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().to_rfc3339());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().to_rfc3339())
}

/// Cleans (validates and coerces) one raw input value.
///
/// Performs, in order:
/// 1. Disabled fields short-circuit to their initial value
/// 2. Required check against Django's empty values
/// 3. Type coercion and type-specific validation
///
/// Returns the cleaned value or the list of error messages.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&Value>) -> Result<Value, Vec<String>> {
    if field.disabled {
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    let stripped;
    let raw = match (&field.field_type, raw) {
        (FormFieldType::Char { strip: true, .. } | FormFieldType::Email { .. }, Some(Value::String(s))) => {
            stripped = Value::String(s.trim().to_string());
            Some(&stripped)
        }
        _ => raw,
    };

    let empty = match field.field_type {
        FormFieldType::Boolean => !raw.is_some_and(parse_bool),
        _ => is_empty_value(raw),
    };
    if empty {
        if field.required {
            return Err(vec![field.message("required", REQUIRED_MESSAGE)]);
        }
        return Ok(field.empty_value());
    }
    let Some(raw) = raw else {
        return Ok(field.empty_value());
    };

    let mut errors = Vec::new();
    let value = match &field.field_type {
        FormFieldType::Char { max_length, .. } => match as_text(raw) {
            Some(text) => {
                check_max_length(field, &text, *max_length, &mut errors);
                Value::String(text)
            }
            None => {
                errors.push(field.message("invalid", "Enter a valid value."));
                Value::Null
            }
        },

        FormFieldType::Integer {
            min_value,
            max_value,
        } => match parse_integer(raw) {
            Some(n) => {
                if let Some(min) = min_value {
                    if n < *min {
                        errors.push(format!(
                            "Ensure this value is greater than or equal to {min}."
                        ));
                    }
                }
                if let Some(max) = max_value {
                    if n > *max {
                        errors.push(format!("Ensure this value is less than or equal to {max}."));
                    }
                }
                Value::from(n)
            }
            None => {
                errors.push(field.message("invalid", "Enter a whole number."));
                Value::Null
            }
        },

        FormFieldType::Boolean => Value::Bool(parse_bool(raw)),

        FormFieldType::Email { max_length } => {
            let text = as_text(raw).unwrap_or_default();
            let valid = EMAIL_RE.as_ref().is_some_and(|re| re.is_match(&text));
            if !valid {
                errors.push(field.message("invalid", "Enter a valid email address."));
            }
            check_max_length(field, &text, *max_length, &mut errors);
            Value::String(text)
        }

        FormFieldType::DateTime => match raw.as_str().and_then(parse_datetime) {
            Some(text) => Value::String(text),
            None => {
                errors.push(field.message("invalid", "Enter a valid date/time."));
                Value::Null
            }
        },

        FormFieldType::Json => match raw {
            Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| {
                errors.push(field.message("invalid", "Enter a valid JSON."));
                Value::Null
            }),
            other => other.clone(),
        },

        FormFieldType::ModelChoice { .. } => normalize_pk(raw).unwrap_or_else(|| {
            errors.push(field.message("invalid_choice", INVALID_CHOICE_MESSAGE));
            Value::Null
        }),

        FormFieldType::ModelMultipleChoice { .. } => match raw {
            Value::Array(items) => {
                let mut pks = Vec::with_capacity(items.len());
                for item in items {
                    match normalize_pk(item) {
                        Some(pk) => pks.push(pk),
                        None => errors.push(invalid_item_message(field, item)),
                    }
                }
                Value::Array(pks)
            }
            _ => {
                errors.push(field.message("invalid_list", "Enter a list of values."));
                Value::Null
            }
        },
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

/// The message for one rejected item of a multiple-choice field.
pub fn invalid_item_message(field: &FormFieldDef, item: &Value) -> String {
    let shown = as_text(item).unwrap_or_else(|| item.to_string());
    field.message(
        "invalid_choice",
        &format!("Select a valid choice. {shown} is not one of the available choices."),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_required_missing_and_empty() {
        let field = FormFieldDef::char("name", Some(32));
        assert_eq!(clean_field_value(&field, None), Err(vec![REQUIRED_MESSAGE.to_string()]));
        assert_eq!(
            clean_field_value(&field, Some(&json!("   "))),
            Err(vec![REQUIRED_MESSAGE.to_string()])
        );
    }

    #[test]
    fn test_optional_empty_values() {
        let char_field = FormFieldDef::char("name", None).required(false);
        assert_eq!(clean_field_value(&char_field, None), Ok(json!("")));
        let m2m = FormFieldDef::new(
            "many_field",
            FormFieldType::ModelMultipleChoice { to: "tests.bar".into() },
        )
        .required(false);
        assert_eq!(clean_field_value(&m2m, Some(&json!([]))), Ok(json!([])));
    }

    #[test]
    fn test_custom_required_message() {
        let field = FormFieldDef::integer("n").error_message("required", "Need it.");
        assert_eq!(clean_field_value(&field, None), Err(vec!["Need it.".to_string()]));
    }

    #[test]
    fn test_char_max_length() {
        let field = FormFieldDef::char("name", Some(3));
        assert_eq!(
            clean_field_value(&field, Some(&json!("abcd"))),
            Err(vec!["Ensure this value has at most 3 characters (it has 4).".to_string()])
        );
        assert_eq!(clean_field_value(&field, Some(&json!(12))), Ok(json!("12")));
    }

    #[test]
    fn test_integer() {
        let field = FormFieldDef::integer("an_integer");
        assert_eq!(clean_field_value(&field, Some(&json!(777))), Ok(json!(777)));
        assert_eq!(clean_field_value(&field, Some(&json!(" 42 "))), Ok(json!(42)));
        assert_eq!(
            clean_field_value(&field, Some(&json!("x"))),
            Err(vec!["Enter a whole number.".to_string()])
        );
    }

    #[test]
    fn test_boolean() {
        let field = FormFieldDef::new("flag", FormFieldType::Boolean).required(false);
        assert_eq!(clean_field_value(&field, Some(&json!("false"))), Ok(json!(false)));
        assert_eq!(clean_field_value(&field, Some(&json!("on"))), Ok(json!(true)));
        let required = FormFieldDef::new("agree", FormFieldType::Boolean);
        assert!(clean_field_value(&required, Some(&json!(false))).is_err());
    }

    #[test]
    fn test_email() {
        let field = FormFieldDef::new("email", FormFieldType::Email { max_length: Some(254) });
        assert_eq!(
            clean_field_value(&field, Some(&json!(" a@b.com "))),
            Ok(json!("a@b.com"))
        );
        assert_eq!(
            clean_field_value(&field, Some(&json!("nope"))),
            Err(vec!["Enter a valid email address.".to_string()])
        );
    }

    #[test]
    fn test_datetime() {
        let field = FormFieldDef::new("when", FormFieldType::DateTime);
        let cleaned = clean_field_value(&field, Some(&json!("2024-01-02 03:04:05"))).unwrap();
        assert_eq!(cleaned, json!("2024-01-02T03:04:05+00:00"));
        assert!(clean_field_value(&field, Some(&json!("yesterday"))).is_err());
    }

    #[test]
    fn test_json() {
        let field = FormFieldDef::new("data", FormFieldType::Json);
        assert_eq!(clean_field_value(&field, Some(&json!("{\"a\": 1}"))), Ok(json!({"a": 1})));
        assert_eq!(clean_field_value(&field, Some(&json!({"a": 1}))), Ok(json!({"a": 1})));
        assert!(clean_field_value(&field, Some(&json!("{"))).is_err());
    }

    #[test]
    fn test_model_choice_shapes() {
        let fk = FormFieldDef::new("foreign_field", FormFieldType::ModelChoice { to: "tests.foo".into() });
        assert_eq!(clean_field_value(&fk, Some(&json!("3"))), Ok(json!(3)));
        assert_eq!(
            clean_field_value(&fk, Some(&json!("abc"))),
            Err(vec![INVALID_CHOICE_MESSAGE.to_string()])
        );

        let m2m = FormFieldDef::new(
            "many_field",
            FormFieldType::ModelMultipleChoice { to: "tests.bar".into() },
        );
        assert_eq!(clean_field_value(&m2m, Some(&json!(["1", 2]))), Ok(json!([1, 2])));
        assert_eq!(
            clean_field_value(&m2m, Some(&json!("1"))),
            Err(vec!["Enter a list of values.".to_string()])
        );
        assert_eq!(
            clean_field_value(&m2m, Some(&json!(["x"]))),
            Err(vec!["Select a valid choice. x is not one of the available choices.".to_string()])
        );
    }

    #[test]
    fn test_disabled_keeps_initial() {
        let field = FormFieldDef::char("name", None).disabled(true).initial(json!("fixed"));
        assert_eq!(clean_field_value(&field, Some(&json!("other"))), Ok(json!("fixed")));
    }
}
