//! Installed applications.
//!
//! [`AppRegistry`] is built once from `Settings::installed_apps` and keeps
//! declaration order; discovery walks it back to front.

use std::collections::HashMap;

use crate::error::{ExtrasError, ExtrasResult};

/// One entry of `installed_apps`.
///
/// ```
/// use rest_extras_core::apps::AppConfig;
///
/// let app = AppConfig::new("django.contrib.auth");
/// assert_eq!(app.label(), "auth");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    name: String,
    label: String,
}

impl AppConfig {
    /// The label is the last dotted component of `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = name.rsplit('.').next().unwrap_or_default().to_string();
        Self { name, label }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: Vec<AppConfig>,
    by_label: HashMap<String, usize>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `ImproperlyConfigured` when two names share a label.
    pub fn from_installed_apps<S: AsRef<str>>(names: &[S]) -> ExtrasResult<Self> {
        let mut registry = Self::new();
        for name in names {
            registry.register(AppConfig::new(name.as_ref()))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, app: AppConfig) -> ExtrasResult<()> {
        if self.by_label.contains_key(app.label()) {
            return Err(ExtrasError::ImproperlyConfigured(format!(
                "Application labels aren't unique, duplicates: {}",
                app.label()
            )));
        }
        self.by_label.insert(app.label().to_string(), self.apps.len());
        self.apps.push(app);
        Ok(())
    }

    pub fn get_app_config(&self, label: &str) -> Option<&AppConfig> {
        self.by_label.get(label).and_then(|&index| self.apps.get(index))
    }

    /// Declaration order.
    pub fn get_app_configs(&self) -> &[AppConfig] {
        &self.apps
    }

    pub fn is_installed(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_in_declaration_order() {
        let registry =
            AppRegistry::from_installed_apps(&["rest_framework_extras.tests", "django.contrib.auth"])
                .unwrap();
        let labels: Vec<&str> = registry.get_app_configs().iter().map(AppConfig::label).collect();
        assert_eq!(labels, vec!["tests", "auth"]);
        assert!(registry.is_installed("auth"));
        assert!(!registry.is_installed("django.contrib.auth"));
    }

    #[test]
    fn test_undotted_name_is_its_own_label() {
        let app = AppConfig::new("tests");
        assert_eq!(app.label(), "tests");
        assert_eq!(app.name(), "tests");
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let result = AppRegistry::from_installed_apps(&["a.auth", "b.auth"]);
        assert!(matches!(result, Err(ExtrasError::ImproperlyConfigured(_))));
    }

    #[test]
    fn test_lookup_by_label() {
        let registry = AppRegistry::from_installed_apps(&["django.contrib.sessions"]).unwrap();
        assert_eq!(
            registry.get_app_config("sessions").map(AppConfig::name),
            Some("django.contrib.sessions")
        );
        assert!(registry.get_app_config("admin").is_none());
    }
}
