//! Form delegation.
//!
//! A [`FormSerializer`] validates and saves through a form, so rules written
//! once for the admin or a form class also hold for the API. The form comes
//! from the model's admin options when given, otherwise from an explicit
//! form class. Without either, it behaves exactly like the wrapped
//! [`ModelSerializer`].
//!
//! Forms know nothing about partial updates: a form bound to the fields of a
//! PATCH reports every omitted required field as missing. Those errors are
//! dropped, and the fields excluded from the save, when the only message for
//! a field is the stock "This field is required." text.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use rest_extras_admin::{AdminOptions, AdminSite, ModelAdmin};
use rest_extras_core::error::NON_FIELD_ERRORS;
use rest_extras_core::{ExtrasResult, ValidationError};
use rest_extras_db::Record;
use rest_extras_forms::{Form, FormClass, FormErrors, FormInit, ALL_FIELDS, REQUIRED_MESSAGE};

use super::model::ModelSerializer;
use super::{Serializer, SerializerField};
use crate::relations::normalize_relations;
use crate::request::RequestData;

/// Where a serializer's form comes from.
#[derive(Clone, Default)]
pub struct FormDelegation {
    pub form: Option<Arc<dyn FormClass>>,
    pub admin: Option<AdminOptions>,
    /// The site the admin options belong to. The default site when unset.
    pub admin_site: Option<Arc<AdminSite>>,
}

impl std::fmt::Debug for FormDelegation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDelegation")
            .field("form", &self.form.as_ref().map(|form| form.name().to_string()))
            .field("admin", &self.admin.as_ref().map(|admin| admin.name.clone()))
            .field("admin_site", &self.admin_site.as_ref().map(|site| site.name().to_string()))
            .finish()
    }
}

impl FormDelegation {
    pub const fn is_empty(&self) -> bool {
        self.form.is_none() && self.admin.is_none()
    }
}

/// A model serializer that validates and saves through a form.
pub struct FormSerializer {
    inner: ModelSerializer,
    delegation: FormDelegation,
    form: Option<Box<dyn Form>>,
}

impl std::fmt::Debug for FormSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSerializer")
            .field("inner", &self.inner)
            .field("delegation", &self.delegation)
            .field("bound", &self.form.is_some())
            .finish()
    }
}

impl FormSerializer {
    pub const fn new(inner: ModelSerializer, delegation: FormDelegation) -> Self {
        Self {
            inner,
            delegation,
            form: None,
        }
    }

    pub const fn inner(&self) -> &ModelSerializer {
        &self.inner
    }

    /// The bound form, once validation has run.
    pub fn form(&self) -> Option<&dyn Form> {
        self.form.as_deref()
    }

    /// The form class to validate with, if any. Admin options win over an
    /// explicit form.
    pub fn form_class(&self) -> Option<Arc<dyn FormClass>> {
        if let Some(admin) = &self.delegation.admin {
            let site = self
                .delegation
                .admin_site
                .clone()
                .unwrap_or_else(AdminSite::default_site);
            let model_admin = ModelAdmin::new(Arc::clone(self.inner.meta()), admin.clone(), site);
            return Some(model_admin.get_form(&self.inner.context().user, self.inner.instance()));
        }
        self.delegation.form.clone()
    }

    fn bind(&self, class: &dyn FormClass, attrs: &Record) -> Box<dyn Form> {
        let models = &self.inner.context().models;
        let init = FormInit::new(normalize_relations(attrs, self.inner.fields(), models), Arc::clone(models))
            .with_instance(self.inner.instance().cloned());
        class.construct(init)
    }

    /// Form fields the serializer never reads from the request. A required
    /// one can never validate through the API.
    pub fn unserialized_fields(&self, form: &dyn Form) -> Vec<String> {
        let serialized: HashSet<&str> = self.inner.fields().iter().map(|f| f.name.as_str()).collect();
        form.field_names()
            .into_iter()
            .filter(|name| !serialized.contains(name))
            .map(String::from)
            .collect()
    }

    fn warn_unserialized_fields(&self, class: &dyn FormClass, form: &dyn Form) {
        let missing = self.unserialized_fields(form);
        if !missing.is_empty() {
            tracing::warn!(
                form = class.name(),
                serializer = self.inner.name(),
                fields = ?missing,
                "form fields are not in the serializer; validation may fail"
            );
        }
    }
}

/// Drops errors that only say a field is required, excluding those fields
/// from the save. Returns the dropped field names.
fn drop_required_errors(form: &mut dyn Form) -> Vec<String> {
    let mut dropped: Vec<String> = form
        .errors()
        .iter()
        .filter(|(name, messages)| {
            name.as_str() != ALL_FIELDS && messages.len() == 1 && messages[0] == REQUIRED_MESSAGE
        })
        .map(|(name, _)| name.clone())
        .collect();
    dropped.sort();
    for name in &dropped {
        form.errors_mut().remove(name);
        form.exclude(name);
    }
    dropped
}

fn form_validation_error(errors: &FormErrors) -> ValidationError {
    let errors: HashMap<String, Vec<String>> = errors
        .iter()
        .map(|(name, messages)| {
            let name = if name == ALL_FIELDS { NON_FIELD_ERRORS } else { name.as_str() };
            (name.to_string(), messages.clone())
        })
        .collect();
    ValidationError::from_messages(&errors)
}

#[async_trait]
impl Serializer for FormSerializer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fields(&self) -> &[SerializerField] {
        self.inner.fields()
    }

    fn instance(&self) -> Option<&Record> {
        self.inner.instance()
    }

    async fn run_validation(&mut self, data: &RequestData) -> ExtrasResult<Record> {
        let attrs = self.inner.validate_fields(data).await?;
        self.validate(attrs).await
    }

    async fn validate(&mut self, attrs: Record) -> ExtrasResult<Record> {
        let Some(class) = self.form_class() else {
            return self.inner.validate(attrs).await;
        };
        let mut form = self.bind(class.as_ref(), &attrs);
        self.warn_unserialized_fields(class.as_ref(), form.as_ref());

        if !form.is_valid().await {
            if self.inner.context().partial {
                for field in drop_required_errors(form.as_mut()) {
                    tracing::warn!(
                        form = class.name(),
                        field = %field,
                        "ignoring required field omitted from a partial update"
                    );
                }
            }
            if !form.is_valid().await {
                return Err(form_validation_error(form.errors()).into());
            }
        }
        self.form = Some(form);
        self.inner.validate(attrs).await
    }

    async fn save(&mut self, validated: Record) -> ExtrasResult<Record> {
        if self.delegation.is_empty() {
            return self.inner.save(validated).await;
        }
        let mut form = match self.form.take() {
            Some(form) => form,
            None => {
                let Some(class) = self.form_class() else {
                    return self.inner.save(validated).await;
                };
                let mut form = self.bind(class.as_ref(), &validated);
                if !form.is_valid().await {
                    return Err(form_validation_error(form.errors()).into());
                }
                form
            }
        };
        let result = form.save().await;
        self.form = Some(form);
        match result {
            Ok(saved) => {
                self.inner.set_instance(saved.clone());
                Ok(saved)
            }
            Err(err) if self.inner.context().partial => {
                tracing::error!(
                    serializer = self.inner.name(),
                    error = %err,
                    "save failed during a partial update; required fields may have been omitted"
                );
                Err(err.during_partial_update())
            }
            Err(err) => Err(err),
        }
    }

    fn to_representation(&self, instance: &Record) -> Value {
        self.inner.to_representation(instance)
    }
}
