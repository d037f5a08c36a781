//! Model-backed forms that generate their fields from model metadata.
//!
//! [`ModelFormClass`] is the equivalent of a Django `ModelForm` subclass: a
//! model, a `fields`/`exclude` selection, declared extra fields and an
//! optional cross-field `clean` hook. Calling
//! [`construct`](FormClass::construct) yields a bound [`ModelForm`], whose
//! `save()` creates or updates the row through the model's manager.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult, ValidationError};
use rest_extras_db::manager::record_pk;
use rest_extras_db::{FieldDef, FieldType, ModelMeta, ModelRegistry, Record};

use crate::fields::{FormFieldDef, FormFieldType};
use crate::form::{Form, FormClass, FormErrors, FormInit};
use crate::validation;

/// A form-wide validation hook run after field cleaning.
///
/// Receives the cleaned data so far. A bare error is reported under
/// `__all__`; an error with field errors is reported per field.
pub type CleanHook = Arc<dyn Fn(&Record) -> Result<(), ValidationError> + Send + Sync>;

/// Specifies which model fields a model form includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelFormFields {
    /// Include all editable fields.
    All,
    /// Include only the specified fields, in model order.
    Include(Vec<String>),
}

/// A model form class.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rest_extras_db::{FieldDef, ModelMeta};
/// use rest_extras_forms::{FormFieldDef, ModelFormClass};
///
/// let meta = Arc::new(
///     ModelMeta::new("tests", "WithForm")
///         .field(FieldDef::char("editable_field", 32))
///         .field(FieldDef::char("non_editable_field", 32).not_editable()),
/// );
/// let class = ModelFormClass::new("WithFormForm", meta)
///     .declare(FormFieldDef::integer("an_integer"));
///
/// let names: Vec<String> = class.form_fields().into_iter().map(|f| f.name).collect();
/// assert_eq!(names, vec!["editable_field", "an_integer"]);
/// ```
#[derive(Clone)]
pub struct ModelFormClass {
    name: String,
    meta: Arc<ModelMeta>,
    fields: ModelFormFields,
    exclude: Vec<String>,
    declared: Vec<FormFieldDef>,
    clean: Option<CleanHook>,
}

impl ModelFormClass {
    /// Creates a form class over all editable fields of a model.
    pub fn new(name: impl Into<String>, meta: Arc<ModelMeta>) -> Self {
        Self {
            name: name.into(),
            meta,
            fields: ModelFormFields::All,
            exclude: Vec::new(),
            declared: Vec::new(),
            clean: None,
        }
    }

    /// Restricts the form to the given model fields.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = ModelFormFields::Include(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Includes every editable model field.
    #[must_use]
    pub fn all_fields(mut self) -> Self {
        self.fields = ModelFormFields::All;
        self
    }

    /// Leaves the given model fields out of the form.
    #[must_use]
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.exclude.contains(&field) {
                self.exclude.push(field);
            }
        }
        self
    }

    /// Declares an extra field. A declared field replaces a model field of
    /// the same name and is always part of the form.
    #[must_use]
    pub fn declare(mut self, field: FormFieldDef) -> Self {
        self.declared.retain(|f| f.name != field.name);
        self.declared.push(field);
        self
    }

    /// Sets the form-wide validation hook.
    #[must_use]
    pub fn clean<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Record) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.clean = Some(Arc::new(hook));
        self
    }

    /// Renames the class.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The model this form edits.
    pub fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    /// The model field selection.
    pub const fn selected_fields(&self) -> &ModelFormFields {
        &self.fields
    }

    /// The excluded model fields.
    pub fn excluded_fields(&self) -> &[String] {
        &self.exclude
    }

    /// The declared extra fields.
    pub fn declared_fields(&self) -> &[FormFieldDef] {
        &self.declared
    }

    fn includes(&self, name: &str) -> bool {
        let selected = match &self.fields {
            ModelFormFields::All => true,
            ModelFormFields::Include(names) => names.iter().any(|n| n == name),
        };
        selected && !self.exclude.iter().any(|n| n == name)
    }

    /// Builds the form fields: model fields in declaration order, then
    /// declared fields that are not model fields.
    pub fn form_fields(&self) -> Vec<FormFieldDef> {
        let mut fields: Vec<FormFieldDef> = self
            .meta
            .editable_fields()
            .filter(|f| self.includes(&f.name))
            .filter_map(|f| {
                self.declared
                    .iter()
                    .find(|d| d.name == f.name)
                    .cloned()
                    .or_else(|| formfield(f))
            })
            .collect();
        for declared in &self.declared {
            if !fields.iter().any(|f| f.name == declared.name) {
                fields.push(declared.clone());
            }
        }
        fields
    }
}

impl std::fmt::Debug for ModelFormClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFormClass")
            .field("name", &self.name)
            .field("model", &self.meta.model_key())
            .field("fields", &self.fields)
            .field("exclude", &self.exclude)
            .field("declared", &self.declared.len())
            .field("has_clean", &self.clean.is_some())
            .finish()
    }
}

/// Converts a model field to its default form field.
///
/// Required unless the model field may be blank. Booleans are never required,
/// since an unchecked box is a valid `false`.
pub fn formfield(field: &FieldDef) -> Option<FormFieldDef> {
    let field_type = match &field.field_type {
        FieldType::AutoField => return None,
        FieldType::CharField { max_length } => FormFieldType::Char {
            max_length: Some(*max_length),
            strip: true,
        },
        FieldType::TextField => FormFieldType::Char {
            max_length: None,
            strip: true,
        },
        FieldType::IntegerField => FormFieldType::Integer {
            min_value: None,
            max_value: None,
        },
        FieldType::BooleanField => FormFieldType::Boolean,
        FieldType::DateTimeField => FormFieldType::DateTime,
        FieldType::EmailField { max_length } => FormFieldType::Email {
            max_length: Some(*max_length),
        },
        FieldType::JsonField => FormFieldType::Json,
        FieldType::ForeignKey { to } => FormFieldType::ModelChoice { to: to.clone() },
        FieldType::ManyToManyField { to } => FormFieldType::ModelMultipleChoice { to: to.clone() },
    };
    let required = !field.blank && field_type != FormFieldType::Boolean;
    Some(
        FormFieldDef::new(&field.name, field_type)
            .required(required)
            .label(&field.verbose_name),
    )
}

impl FormClass for ModelFormClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> Option<&ModelMeta> {
        Some(&self.meta)
    }

    fn construct(&self, init: FormInit) -> Box<dyn Form> {
        Box::new(ModelForm {
            fields: self.form_fields(),
            class: self.clone(),
            data: init.data,
            instance: init.instance,
            models: init.models,
            errors: FormErrors::new(),
            cleaned_data: Record::new(),
            excluded: Vec::new(),
            cleaned: false,
        })
    }
}

/// A bound model form.
pub struct ModelForm {
    class: ModelFormClass,
    fields: Vec<FormFieldDef>,
    data: Record,
    instance: Option<Record>,
    models: Arc<ModelRegistry>,
    errors: FormErrors,
    cleaned_data: Record,
    excluded: Vec<String>,
    cleaned: bool,
}

impl ModelForm {
    /// The row this form edits, if any.
    pub const fn instance(&self) -> Option<&Record> {
        self.instance.as_ref()
    }

    fn instance_pk(&self) -> Option<Value> {
        self.instance
            .as_ref()
            .and_then(|row| record_pk(&self.class.meta, row))
            .cloned()
    }

    async fn full_clean(&mut self) {
        self.errors.clear();
        self.cleaned_data.clear();
        validation::clean_fields(&self.fields, &self.data, &mut self.cleaned_data, &mut self.errors);
        validation::check_relations(&self.fields, &self.models, &mut self.cleaned_data, &mut self.errors)
            .await;
        if let Some(hook) = &self.class.clean {
            if let Err(error) = hook(&self.cleaned_data) {
                validation::add_clean_error(error, &mut self.cleaned_data, &mut self.errors);
            }
        }
        let pk = self.instance_pk();
        validation::check_unique(
            &self.class.meta,
            &self.models,
            pk.as_ref(),
            &mut self.cleaned_data,
            &mut self.errors,
        )
        .await;
    }

    /// Collects the values to store: cleaned model fields that are part of
    /// the form and not excluded.
    fn construct_values(&self) -> Record {
        let meta = &self.class.meta;
        let mut values = Record::new();
        for field in &self.fields {
            if self.excluded.contains(&field.name) {
                continue;
            }
            let Some(model_field) = meta.get_field(&field.name) else {
                continue;
            };
            if !model_field.editable || model_field.primary_key {
                continue;
            }
            // Omitted fields with a default keep it.
            if model_field.has_default() && !self.data.contains_key(&field.name) {
                continue;
            }
            if let Some(value) = self.cleaned_data.get(&field.name) {
                values.insert(field.name.clone(), value.clone());
            }
        }
        values
    }
}

#[async_trait]
impl Form for ModelForm {
    fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    fn is_bound(&self) -> bool {
        true
    }

    async fn is_valid(&mut self) -> bool {
        if !self.cleaned {
            self.full_clean().await;
            self.cleaned = true;
        }
        self.errors.is_empty()
    }

    fn errors(&self) -> &FormErrors {
        &self.errors
    }

    fn errors_mut(&mut self) -> &mut FormErrors {
        &mut self.errors
    }

    fn cleaned_data(&self) -> &Record {
        &self.cleaned_data
    }

    fn exclude(&mut self, field: &str) {
        if !self.excluded.iter().any(|f| f == field) {
            self.excluded.push(field.to_string());
        }
    }

    fn excluded(&self) -> &[String] {
        &self.excluded
    }

    async fn save(&mut self) -> ExtrasResult<Record> {
        let meta = self.class.meta.clone();
        let pk = self.instance_pk();
        if !self.cleaned || !self.errors.is_empty() {
            return Err(ExtrasError::BadRequest(format!(
                "The {} could not be {} because the data didn't validate.",
                meta.object_name,
                if pk.is_some() { "changed" } else { "created" }
            )));
        }
        let manager = self
            .models
            .get_by_key(&meta.model_key())
            .and_then(|m| m.objects())
            .ok_or_else(|| {
                ExtrasError::ImproperlyConfigured(format!(
                    "Model '{}' has no manager",
                    meta.model_key()
                ))
            })?;

        let values = self.construct_values();
        let saved = match pk {
            Some(pk) => manager.update(&pk, values).await?,
            None => manager.create(values).await?,
        };
        tracing::debug!(form = %self.class.name, model = %meta.model_key(), "saved form");
        self.instance = Some(saved.clone());
        Ok(saved)
    }
}
