//! Settings for rest-extras hosts.
//!
//! [`Settings`] holds the host configuration the extras need: installed apps,
//! logging, sessions, and the `rest_framework_extras` block described by
//! [`ExtrasSettings`]. There is no global instance. Settings are loaded once at
//! startup (see [`settings_loader`](crate::settings_loader)) and passed by
//! reference into discovery and registration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The `rest_framework_extras` settings block.
///
/// Keys use kebab-case on the wire (`blacklist`, `authentication-classes`,
/// `permission-classes`). Any key left out of a configuration file keeps its
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtrasSettings {
    /// Route paths (`app_label-model_name`) that discovery never registers.
    pub blacklist: BTreeSet<String>,
    /// Authentication class names applied to generated viewsets, in order.
    pub authentication_classes: Vec<String>,
    /// Permission class names applied to generated viewsets.
    pub permission_classes: Vec<String>,
}

impl Default for ExtrasSettings {
    fn default() -> Self {
        Self {
            blacklist: ["sessions-session", "admin-logentry"]
                .into_iter()
                .map(String::from)
                .collect(),
            authentication_classes: vec![
                "SessionAuthentication".to_string(),
                "BasicAuthentication".to_string(),
            ],
            permission_classes: vec!["DjangoModelPermissions".to_string()],
        }
    }
}

impl ExtrasSettings {
    /// Returns `true` if the given route path is blacklisted.
    pub fn is_blacklisted(&self, path: &str) -> bool {
        self.blacklist.contains(path)
    }
}

/// Host settings.
///
/// # Examples
///
/// ```
/// use rest_extras_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.rest_framework_extras.is_blacklisted("sessions-session"));
/// assert_eq!(settings.session_cookie_name, "sessionid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enables pretty log output and verbose diagnostics.
    pub debug: bool,
    /// A tracing filter directive such as `"info"` or `"rest_extras_rest=debug"`.
    pub log_level: String,
    /// Secret used for signing. Not used for hashing passwords.
    pub secret_key: String,
    /// Installed applications in declaration order, as dotted names.
    pub installed_apps: Vec<String>,
    /// Name of the session cookie set by the login endpoint.
    pub session_cookie_name: String,
    /// Realm announced in `WWW-Authenticate` challenges.
    pub www_authenticate_realm: String,
    /// The extras block.
    pub rest_framework_extras: ExtrasSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            secret_key: String::new(),
            installed_apps: vec![
                "rest_framework_extras".to_string(),
                "django.contrib.admin".to_string(),
                "django.contrib.auth".to_string(),
                "django.contrib.contenttypes".to_string(),
                "django.contrib.sessions".to_string(),
            ],
            session_cookie_name: "sessionid".to_string(),
            www_authenticate_realm: "api".to_string(),
            rest_framework_extras: ExtrasSettings::default(),
        }
    }
}
