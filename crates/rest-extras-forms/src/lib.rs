//! # rest-extras-forms
//!
//! Forms framework for rest-extras. Provides the [`Form`](form::Form) and
//! [`FormClass`](form::FormClass) traits, field types with Django's cleaning
//! rules and messages, and model forms generated from
//! [`ModelMeta`](rest_extras_db::ModelMeta).
//!
//! Forms work on JSON [`Record`](rest_extras_db::Record)s: bound data is a
//! record, cleaned data is a record, and saving writes a record through the
//! model's manager.

pub mod fields;
pub mod form;
pub mod model_form;
pub mod validation;

pub use fields::{FormFieldDef, FormFieldType, REQUIRED_MESSAGE};
pub use form::{Form, FormClass, FormErrors, FormInit, ALL_FIELDS};
pub use model_form::{CleanHook, ModelForm, ModelFormClass, ModelFormFields};
