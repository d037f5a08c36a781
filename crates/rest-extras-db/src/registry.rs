//! The model registry.
//!
//! [`ModelRegistry`] holds every concrete [`ModelClass`] known to the host,
//! in registration order. It answers the catalog's `model_class()` lookups.

use std::collections::HashMap;
use std::sync::Arc;

use rest_extras_core::{ExtrasError, ExtrasResult};

use crate::manager::Manager;
use crate::model::ModelMeta;

/// A model together with its optional manager.
///
/// A model class without a manager lacks the standard collection-query
/// capability and is skipped by discovery.
#[derive(Clone)]
pub struct ModelClass {
    /// The model metadata.
    pub meta: Arc<ModelMeta>,
    /// The `objects` accessor, if the model has one.
    pub manager: Option<Arc<dyn Manager>>,
}

impl ModelClass {
    /// Creates a model class with a manager.
    pub fn managed(meta: Arc<ModelMeta>, manager: Arc<dyn Manager>) -> Self {
        Self {
            meta,
            manager: Some(manager),
        }
    }

    /// Creates a model class without a manager.
    pub const fn unmanaged(meta: Arc<ModelMeta>) -> Self {
        Self { meta, manager: None }
    }

    /// Returns the manager, if any.
    pub fn objects(&self) -> Option<&Arc<dyn Manager>> {
        self.manager.as_ref()
    }
}

impl std::fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClass")
            .field("model", &self.meta.model_key())
            .field("has_manager", &self.manager.is_some())
            .finish()
    }
}

/// Registry of concrete model classes, keyed by `app_label.model_name`.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelClass>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model class.
    ///
    /// Abstract models cannot be registered, and each model key may only be
    /// registered once.
    pub fn register(&mut self, class: ModelClass) -> ExtrasResult<()> {
        if class.meta.abstract_model {
            return Err(ExtrasError::ImproperlyConfigured(format!(
                "Abstract model '{}' cannot be registered",
                class.meta.object_name
            )));
        }
        let key = class.meta.model_key();
        if self.index.contains_key(&key) {
            return Err(ExtrasError::ImproperlyConfigured(format!(
                "Conflicting '{}' models in application '{}'",
                class.meta.model_name, class.meta.app_label
            )));
        }
        self.index.insert(key, self.models.len());
        self.models.push(class);
        Ok(())
    }

    /// Looks up a model class by app label and model name.
    pub fn get(&self, app_label: &str, model_name: &str) -> Option<&ModelClass> {
        self.get_by_key(&format!("{app_label}.{model_name}"))
    }

    /// Looks up a model class by `app_label.model_name`.
    pub fn get_by_key(&self, key: &str) -> Option<&ModelClass> {
        self.index.get(key).map(|&idx| &self.models[idx])
    }

    /// Returns the model classes of one application, in registration order.
    pub fn for_app(&self, app_label: &str) -> Vec<&ModelClass> {
        self.models
            .iter()
            .filter(|m| m.meta.app_label == app_label)
            .collect()
    }

    /// Returns every model class in registration order.
    pub fn all(&self) -> &[ModelClass] {
        &self.models
    }

    /// Returns the number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(app: &str, name: &str) -> ModelClass {
        ModelClass::unmanaged(Arc::new(ModelMeta::new(app, name)))
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ModelRegistry::new();
        registry.register(class("tests", "Bar")).unwrap();
        assert!(registry.get("tests", "bar").is_some());
        assert!(registry.get_by_key("tests.bar").is_some());
        assert!(registry.get("tests", "foo").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_for_app_keeps_order() {
        let mut registry = ModelRegistry::new();
        registry.register(class("tests", "Bar")).unwrap();
        registry.register(class("auth", "User")).unwrap();
        registry.register(class("tests", "Foo")).unwrap();
        let names: Vec<&str> = registry
            .for_app("tests")
            .iter()
            .map(|m| m.meta.model_name.as_str())
            .collect();
        assert_eq!(names, vec!["bar", "foo"]);
    }

    #[test]
    fn test_abstract_rejected() {
        let mut registry = ModelRegistry::new();
        let result =
            registry.register(ModelClass::unmanaged(Arc::new(ModelMeta::new_abstract("tests", "Base"))));
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register(class("tests", "Bar")).unwrap();
        assert!(registry.register(class("tests", "Bar")).is_err());
    }

    #[test]
    fn test_unmanaged_has_no_objects() {
        assert!(class("tests", "WithoutManager").objects().is_none());
    }
}
