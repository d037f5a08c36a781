//! Reading [`Settings`] from TOML or JSON files and `REST_EXTRAS_*` variables.
//!
//! A file only needs the keys it changes: its contents are merged over
//! [`Settings::default`] table by table, so a `[rest_framework_extras]`
//! block naming just `blacklist` keeps the default class lists. Variables
//! are applied last.
//!
//! | Variable | Setting |
//! |---|---|
//! | `REST_EXTRAS_DEBUG` | `debug` |
//! | `REST_EXTRAS_LOG_LEVEL` | `log_level` |
//! | `REST_EXTRAS_SECRET_KEY` | `secret_key` |
//! | `REST_EXTRAS_INSTALLED_APPS` | `installed_apps`, comma-separated |
//! | `REST_EXTRAS_BLACKLIST` | `rest_framework_extras.blacklist`, comma-separated |
//!
//! ```rust,no_run
//! use rest_extras_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/settings.toml").unwrap();
//! ```

use std::path::Path;

use serde_json::Value;

use crate::error::{ExtrasError, ExtrasResult};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
}

impl Format {
    const fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    fn parse(self, text: &str) -> ExtrasResult<Value> {
        let parsed = match self {
            Self::Toml => toml::from_str::<Value>(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| ExtrasError::ConfigurationError(format!("invalid {}: {e}", self.name())))
    }

    fn load(self, text: &str) -> ExtrasResult<Settings> {
        let mut merged = serde_json::to_value(Settings::default())?;
        deep_merge(&mut merged, self.parse(text)?);
        serde_json::from_value(merged).map_err(|e| {
            ExtrasError::ConfigurationError(format!("{} settings rejected: {e}", self.name()))
        })
    }

    fn load_file(self, path: &Path) -> ExtrasResult<Settings> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExtrasError::ConfigurationError(format!("cannot read '{}': {e}", path.display()))
        })?;
        self.load(&text)
    }
}

pub fn from_toml_str(text: &str) -> ExtrasResult<Settings> {
    Format::Toml.load(text)
}

pub fn from_toml_file(path: impl AsRef<Path>) -> ExtrasResult<Settings> {
    Format::Toml.load_file(path.as_ref())
}

/// [`from_toml_file`], then the `REST_EXTRAS_*` variables.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> ExtrasResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

pub fn from_json_str(text: &str) -> ExtrasResult<Settings> {
    Format::Json.load(text)
}

pub fn from_json_file(path: impl AsRef<Path>) -> ExtrasResult<Settings> {
    Format::Json.load_file(path.as_ref())
}

/// [`from_json_file`], then the `REST_EXTRAS_*` variables.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> ExtrasResult<Settings> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults with the `REST_EXTRAS_*` variables applied.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Applies the variable table above, reading values through `lookup`.
pub fn apply_overrides_from(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(flag) = lookup("REST_EXTRAS_DEBUG") {
        settings.debug = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Some(level) = lookup("REST_EXTRAS_LOG_LEVEL") {
        settings.log_level = level;
    }
    if let Some(key) = lookup("REST_EXTRAS_SECRET_KEY") {
        settings.secret_key = key;
    }
    if let Some(apps) = lookup("REST_EXTRAS_INSTALLED_APPS") {
        settings.installed_apps = comma_list(&apps).collect();
    }
    if let Some(paths) = lookup("REST_EXTRAS_BLACKLIST") {
        settings.rest_framework_extras.blacklist = comma_list(&paths).collect();
    }
}

fn comma_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from)
}

/// Merges `patch` into `target`. Objects merge key by key; anything else,
/// arrays included, replaces the target value.
fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_toml_top_level_keys() {
        let settings = from_toml_str(
            r#"
            debug = true
            log_level = "debug"
            installed_apps = ["tests", "django.contrib.auth"]
            "#,
        )
        .unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.installed_apps, vec!["tests", "django.contrib.auth"]);
    }

    #[test]
    fn test_toml_extras_table_keeps_unset_defaults() {
        let settings = from_toml_str(
            r#"
            [rest_framework_extras]
            blacklist = ["tests-bar"]
            permission-classes = ["IsAdminUser"]
            "#,
        )
        .unwrap();
        let extras = &settings.rest_framework_extras;
        assert!(extras.is_blacklisted("tests-bar"));
        assert!(!extras.is_blacklisted("sessions-session"));
        assert_eq!(extras.permission_classes, vec!["IsAdminUser"]);
        assert_eq!(
            extras.authentication_classes,
            vec!["SessionAuthentication", "BasicAuthentication"]
        );
    }

    #[test]
    fn test_empty_toml_is_default() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unparsable_toml() {
        let result = from_toml_str("debug = [");
        assert!(matches!(result, Err(ExtrasError::ConfigurationError(_))));
    }

    #[test]
    fn test_json_extras_block() {
        let settings = from_json_str(
            r#"{"debug": true, "rest_framework_extras": {"authentication-classes": ["BasicAuthentication"]}}"#,
        )
        .unwrap();
        assert!(settings.debug);
        assert_eq!(
            settings.rest_framework_extras.authentication_classes,
            vec!["BasicAuthentication"]
        );
    }

    #[test]
    fn test_json_with_wrong_type_is_rejected() {
        let result = from_json_str(r#"{"installed_apps": "tests"}"#);
        assert!(matches!(result, Err(ExtrasError::ConfigurationError(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = from_toml_file("/nonexistent/settings.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_json_file_on_disk() {
        let path = std::env::temp_dir().join("rest_extras_settings_loader_test.json");
        std::fs::write(&path, r#"{"log_level": "warn"}"#).unwrap();
        let settings = from_json_file(&path).unwrap();
        assert_eq!(settings.log_level, "warn");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("REST_EXTRAS_DEBUG", "1"),
            ("REST_EXTRAS_INSTALLED_APPS", "tests, django.contrib.auth,"),
            ("REST_EXTRAS_BLACKLIST", "tests-bar,tests-foo"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        apply_overrides_from(&mut settings, |k| vars.get(k).map(ToString::to_string));
        assert!(settings.debug);
        assert_eq!(settings.installed_apps, vec!["tests", "django.contrib.auth"]);
        assert!(settings.rest_framework_extras.is_blacklisted("tests-foo"));
        assert!(!settings.rest_framework_extras.is_blacklisted("sessions-session"));
    }

    #[test]
    fn test_overrides_debug_false() {
        let mut settings = Settings {
            debug: true,
            ..Settings::default()
        };
        apply_overrides_from(&mut settings, |k| {
            (k == "REST_EXTRAS_DEBUG").then(|| "no-thanks".to_string())
        });
        assert!(!settings.debug);
    }

    #[test]
    fn test_deep_merge() {
        let mut target = serde_json::json!({"extras": {"blacklist": ["a", "b"], "debug": false}});
        deep_merge(
            &mut target,
            serde_json::json!({"extras": {"blacklist": ["c"]}, "log_level": "info"}),
        );
        assert_eq!(
            target,
            serde_json::json!({
                "extras": {"blacklist": ["c"], "debug": false},
                "log_level": "info",
            })
        );
    }
}
