//! Validation pipeline for form processing.
//!
//! This module implements the Django-style validation pipeline:
//! 1. Field-level cleaning (type coercion and per-field rules)
//! 2. Relation checks against the model managers
//! 3. Form-level cross-field validation
//! 4. Model uniqueness checks
//!
//! Errors accumulate rather than short-circuiting, so all validation
//! issues are reported at once.

use serde_json::Value;

use rest_extras_core::ValidationError;
use rest_extras_db::{ModelMeta, ModelRegistry, Record};

use crate::fields::{clean_field_value, invalid_item_message, FormFieldDef, FormFieldType, INVALID_CHOICE_MESSAGE};
use crate::form::{FormErrors, ALL_FIELDS};

/// Performs field-level cleaning for all fields.
///
/// Populates `cleaned_data` for fields that clean and `errors` for those
/// that do not.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    data: &Record,
    cleaned_data: &mut Record,
    errors: &mut FormErrors,
) {
    for field in field_defs {
        match clean_field_value(field, data.get(&field.name)) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

async fn row_exists(models: &ModelRegistry, to: &str, pk: &Value) -> bool {
    let Some(manager) = models.get_by_key(to).and_then(|m| m.objects()) else {
        return false;
    };
    manager.exists(pk).await.unwrap_or(false)
}

/// Checks that every chosen relation target exists.
///
/// Fields that fail are moved from `cleaned_data` to `errors`.
pub async fn check_relations(
    field_defs: &[FormFieldDef],
    models: &ModelRegistry,
    cleaned_data: &mut Record,
    errors: &mut FormErrors,
) {
    for field in field_defs {
        let Some(value) = cleaned_data.get(&field.name).cloned() else {
            continue;
        };
        let mut field_errors = Vec::new();
        match &field.field_type {
            FormFieldType::ModelChoice { to } if !value.is_null() => {
                if !row_exists(models, to, &value).await {
                    field_errors.push(INVALID_CHOICE_MESSAGE.to_string());
                }
            }
            FormFieldType::ModelMultipleChoice { to } => {
                for item in value.as_array().into_iter().flatten() {
                    if !row_exists(models, to, item).await {
                        field_errors.push(invalid_item_message(field, item));
                    }
                }
            }
            _ => {}
        }
        if !field_errors.is_empty() {
            cleaned_data.remove(&field.name);
            errors.insert(field.name.clone(), field_errors);
        }
    }
}

/// Folds a cross-field validation error into the form errors.
///
/// Per-field errors land under their field (and the field leaves
/// `cleaned_data`); a bare message lands under [`ALL_FIELDS`].
pub fn add_clean_error(error: ValidationError, cleaned_data: &mut Record, errors: &mut FormErrors) {
    if error.has_field_errors() {
        for (field, field_errors) in error.field_errors {
            cleaned_data.remove(&field);
            errors
                .entry(field)
                .or_default()
                .extend(field_errors.into_iter().map(|e| e.message));
        }
    } else {
        errors
            .entry(ALL_FIELDS.to_string())
            .or_default()
            .push(error.message);
    }
}

fn capfirst(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Checks unique model fields against the stored rows.
///
/// The row being edited (`instance_pk`) does not clash with itself.
pub async fn check_unique(
    meta: &ModelMeta,
    models: &ModelRegistry,
    instance_pk: Option<&Value>,
    cleaned_data: &mut Record,
    errors: &mut FormErrors,
) {
    let Some(manager) = models.get_by_key(&meta.model_key()).and_then(|m| m.objects()) else {
        return;
    };
    let pk_name = meta.pk_name();
    for field in meta.fields.iter().filter(|f| f.unique && !f.primary_key) {
        let Some(value) = cleaned_data.get(&field.name).cloned() else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let Ok(rows) = manager.filter(&field.name, &value).await else {
            continue;
        };
        let clash = rows.iter().any(|row| row.get(pk_name) != instance_pk);
        if clash {
            cleaned_data.remove(&field.name);
            errors.entry(field.name.clone()).or_default().push(format!(
                "{} with this {} already exists.",
                capfirst(&meta.verbose_name),
                capfirst(&field.verbose_name)
            ));
        }
    }
}
