//! The [`Form`] and [`FormClass`] traits.
//!
//! A [`Form`] is one bound form instance: data in, errors and cleaned data
//! out, and optionally a save. A [`FormClass`] is the factory that produces
//! bound forms, the counterpart of passing a Django form class around and
//! calling it with `data` and `instance`.
//!
//! Validation is async because relation fields and uniqueness checks query
//! the model managers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use rest_extras_core::ExtrasResult;
use rest_extras_db::{ModelMeta, ModelRegistry, Record};

use crate::fields::FormFieldDef;

/// Key under which form-wide errors are stored.
pub const ALL_FIELDS: &str = "__all__";

/// Per-field error messages, keyed by field name (or [`ALL_FIELDS`]).
pub type FormErrors = HashMap<String, Vec<String>>;

/// The inputs a form class binds a new form to.
#[derive(Debug, Clone)]
pub struct FormInit {
    /// The submitted data.
    pub data: Record,
    /// The existing row being edited, if any.
    pub instance: Option<Record>,
    /// The model registry, for relation lookups and saving.
    pub models: Arc<ModelRegistry>,
}

impl FormInit {
    /// Creates an unbound-instance init for the given data.
    pub const fn new(data: Record, models: Arc<ModelRegistry>) -> Self {
        Self {
            data,
            instance: None,
            models,
        }
    }

    /// Binds the form to an existing row.
    #[must_use]
    pub fn with_instance(mut self, instance: Option<Record>) -> Self {
        self.instance = instance;
        self
    }
}

/// The core form trait. All form types implement this.
///
/// `is_valid()` cleans the data the first time it is called and caches the
/// outcome. Later calls re-decide validity from the current errors, so a
/// caller that edits [`errors_mut`](Form::errors_mut) and excludes fields
/// can ask again without re-running the cleaning.
#[async_trait]
pub trait Form: Send + Sync {
    /// Returns the form's field definitions.
    fn fields(&self) -> &[FormFieldDef];

    /// Returns the field names in form order.
    fn field_names(&self) -> Vec<&str> {
        self.fields().iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns `true` if this form has been bound to data.
    fn is_bound(&self) -> bool;

    /// Validates the form. Returns `true` if it is bound and has no errors.
    async fn is_valid(&mut self) -> bool;

    /// Returns per-field validation errors.
    fn errors(&self) -> &FormErrors;

    /// Returns the errors for in-place editing.
    fn errors_mut(&mut self) -> &mut FormErrors;

    /// Returns the cleaned (validated and coerced) data.
    fn cleaned_data(&self) -> &Record;

    /// Excludes a field from saving.
    fn exclude(&mut self, field: &str);

    /// Returns the excluded field names.
    fn excluded(&self) -> &[String];

    /// Persists the cleaned data and returns the stored row.
    async fn save(&mut self) -> ExtrasResult<Record>;
}

/// A factory of bound forms.
pub trait FormClass: Send + Sync {
    /// The class name, used in diagnostics.
    fn name(&self) -> &str;

    /// The model this form edits, if it is a model form.
    fn model(&self) -> Option<&ModelMeta> {
        None
    }

    /// Builds a form bound to the given data and instance.
    fn construct(&self, init: FormInit) -> Box<dyn Form>;
}

impl std::fmt::Debug for dyn FormClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormClass").field("name", &self.name()).finish()
    }
}
