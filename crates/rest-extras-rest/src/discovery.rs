//! Model discovery.
//!
//! [`discover`] walks the installed apps' content types and registers a
//! generated viewset for every model on a router. Which models are wired,
//! and with which form or admin options, is decided by [`build_filters`]:
//!
//! - without `only`, every model of every installed app, taking the apps in
//!   reverse declaration order
//! - with `only`, just the models it names
//! - `overrides` are then applied in order, replacing earlier entries for the
//!   same model
//!
//! Patterns are `app.model`, `app-model` or a bare `app` for all of its
//! models.
//!
//! ```ignore
//! let ready = discover(
//!     &mut router,
//!     &ctx,
//!     &DiscoverOptions::default().overrides(vec![
//!         OverrideEntry::with_form("tests.withform", form),
//!         "auth-group".into(),
//!     ]),
//! )
//! .await?;
//! ```

use std::sync::Arc;

use rest_extras_admin::{AdminOptions, AdminSite};
use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::ContentType;
use rest_extras_forms::FormClass;

use crate::context::HostContext;
use crate::factory::register_filters;
use crate::router::DefaultRouter;
use crate::serializers::FormDelegation;

/// Extra wiring for one pattern.
#[derive(Clone, Default)]
pub struct EntryOptions {
    pub form: Option<Arc<dyn FormClass>>,
    pub admin: Option<AdminOptions>,
    pub admin_site: Option<Arc<AdminSite>>,
}

impl std::fmt::Debug for EntryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryOptions")
            .field("form", &self.form.as_ref().map(|form| form.name().to_string()))
            .field("admin", &self.admin.as_ref().map(|admin| admin.name.clone()))
            .field("admin_site", &self.admin_site.as_ref().map(|site| site.name().to_string()))
            .finish()
    }
}

impl EntryOptions {
    /// Checks that `admin` and `admin_site` are given together.
    fn check(&self, pattern: &str) -> ExtrasResult<()> {
        if self.admin.is_some() == self.admin_site.is_some() {
            return Ok(());
        }
        Err(ExtrasError::ConfigurationError(format!(
            "'{pattern}': admin and admin_site must be given together"
        )))
    }
}

/// One `only` or `overrides` item.
#[derive(Debug, Clone)]
pub enum OverrideEntry {
    Pattern(String),
    WithOptions(String, EntryOptions),
}

impl OverrideEntry {
    pub fn with_form(pattern: impl Into<String>, form: Arc<dyn FormClass>) -> Self {
        Self::WithOptions(
            pattern.into(),
            EntryOptions {
                form: Some(form),
                ..EntryOptions::default()
            },
        )
    }

    pub fn with_admin(pattern: impl Into<String>, admin: AdminOptions, site: Arc<AdminSite>) -> Self {
        Self::WithOptions(
            pattern.into(),
            EntryOptions {
                admin: Some(admin),
                admin_site: Some(site),
                ..EntryOptions::default()
            },
        )
    }

    pub fn pattern(&self) -> &str {
        match self {
            Self::Pattern(pattern) | Self::WithOptions(pattern, _) => pattern,
        }
    }

    fn options(&self) -> Option<&EntryOptions> {
        match self {
            Self::Pattern(_) => None,
            Self::WithOptions(_, options) => Some(options),
        }
    }
}

impl From<&str> for OverrideEntry {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }
}

impl From<String> for OverrideEntry {
    fn from(pattern: String) -> Self {
        Self::Pattern(pattern)
    }
}

/// A resolved model plus its wiring.
#[derive(Debug, Clone)]
pub struct FilterEntry {
    pub content_type: ContentType,
    pub form: Option<Arc<dyn FormClass>>,
    pub admin: Option<AdminOptions>,
    pub admin_site: Option<Arc<AdminSite>>,
}

impl FilterEntry {
    fn new(content_type: ContentType, options: Option<&EntryOptions>) -> Self {
        let options = options.cloned().unwrap_or_default();
        Self {
            content_type,
            form: options.form,
            admin: options.admin,
            admin_site: options.admin_site,
        }
    }

    /// The route path, `app_label-model_name`.
    pub fn path(&self) -> String {
        format!("{}-{}", self.content_type.app_label, self.content_type.model)
    }

    pub fn delegation(&self) -> FormDelegation {
        FormDelegation {
            form: self.form.clone(),
            admin: self.admin.clone(),
            admin_site: self.admin_site.clone(),
        }
    }
}

/// Filter entries keyed by `app_label.model_name`, in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct FilterMap {
    entries: Vec<(String, FilterEntry)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry. An existing key keeps its position and gets the new
    /// value.
    pub fn insert(&mut self, key: String, entry: FilterEntry) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((key, entry)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, entry)| entry)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterEntry)> {
        self.entries.iter().map(|(k, entry)| (k.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The `only`, `overrides` and `exclude` arguments of [`discover`].
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    pub overrides: Vec<OverrideEntry>,
    /// Empty means every installed model.
    pub only: Vec<OverrideEntry>,
    /// Not supported; must be empty.
    pub exclude: Vec<String>,
}

impl DiscoverOptions {
    #[must_use]
    pub fn overrides(mut self, entries: Vec<OverrideEntry>) -> Self {
        self.overrides = entries;
        self
    }

    #[must_use]
    pub fn only(mut self, entries: Vec<OverrideEntry>) -> Self {
        self.only = entries;
        self
    }

    /// Rejects unsupported or inconsistent options before any lookup.
    fn check(&self) -> ExtrasResult<()> {
        if !self.exclude.is_empty() {
            return Err(ExtrasError::NotImplemented(
                "the exclude argument of discover".to_string(),
            ));
        }
        for entry in self.only.iter().chain(&self.overrides) {
            if let Some(options) = entry.options() {
                options.check(entry.pattern())?;
            }
        }
        Ok(())
    }
}

/// Splits a pattern into an app label and, unless it names a whole app, a
/// lowercase model name.
pub fn split_pattern(pattern: &str) -> (&str, Option<String>) {
    match pattern.split_once(|c: char| c == '.' || c == '-') {
        Some((app, model)) => (app, Some(model.to_lowercase())),
        None => (pattern, None),
    }
}

async fn resolve_pattern(ctx: &HostContext, pattern: &str) -> ExtrasResult<Vec<ContentType>> {
    let unknown = || ExtrasError::ConfigurationError(format!("'{pattern}' does not name an installed model or app"));
    match split_pattern(pattern) {
        (app, Some(model)) => match ctx.catalog().get_by_natural_key(app, &model).await {
            Ok(ct) => Ok(vec![ct]),
            Err(ExtrasError::DoesNotExist(_)) => Err(unknown()),
            Err(err) => Err(err),
        },
        (app, None) => {
            let content_types = ctx.catalog().for_app(app).await?;
            if content_types.is_empty() && !ctx.apps().is_installed(app) {
                return Err(unknown());
            }
            Ok(content_types)
        }
    }
}

async fn apply_entries(ctx: &HostContext, filters: &mut FilterMap, entries: &[OverrideEntry]) -> ExtrasResult<()> {
    for entry in entries {
        for ct in resolve_pattern(ctx, entry.pattern()).await? {
            filters.insert(ct.model_key(), FilterEntry::new(ct, entry.options()));
        }
    }
    Ok(())
}

/// Builds the filter map for the given options.
pub async fn build_filters(ctx: &HostContext, options: &DiscoverOptions) -> ExtrasResult<FilterMap> {
    options.check()?;
    let mut filters = FilterMap::new();
    if options.only.is_empty() {
        for app in ctx.apps().get_app_configs().iter().rev() {
            for ct in ctx.catalog().for_app(app.label()).await? {
                filters.insert(ct.model_key(), FilterEntry::new(ct, None));
            }
        }
    } else {
        apply_entries(ctx, &mut filters, &options.only).await?;
    }
    apply_entries(ctx, &mut filters, &options.overrides).await?;
    Ok(filters)
}

/// Registers a viewset for every discovered model.
///
/// Returns `false`, registering nothing, when the content-type catalog is
/// not migrated yet; call again once it is.
pub async fn discover(router: &mut DefaultRouter, ctx: &HostContext, options: &DiscoverOptions) -> ExtrasResult<bool> {
    options.check()?;
    if !ctx.catalog().is_ready().await {
        tracing::warn!("content types are not available yet, skipping discovery");
        return Ok(false);
    }
    let filters = build_filters(ctx, options).await?;
    let registered = register_filters(router, ctx, &filters)?;
    tracing::info!(models = filters.len(), registered, "discovery complete");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(app: &str, model: &str) -> FilterEntry {
        FilterEntry::new(ContentType::new(1, app, model), None)
    }

    #[test]
    fn test_split_pattern() {
        assert_eq!(split_pattern("tests.WithForm"), ("tests", Some("withform".to_string())));
        assert_eq!(split_pattern("tests-vanilla"), ("tests", Some("vanilla".to_string())));
        assert_eq!(split_pattern("auth"), ("auth", None));
    }

    #[test]
    fn test_filter_map_replaces_in_place() {
        let mut filters = FilterMap::new();
        filters.insert("tests.foo".into(), entry("tests", "foo"));
        filters.insert("tests.bar".into(), entry("tests", "bar"));
        let mut replacement = entry("tests", "foo");
        replacement.admin = Some(AdminOptions::new("FooAdmin"));
        filters.insert("tests.foo".into(), replacement);

        assert_eq!(filters.keys().collect::<Vec<_>>(), vec!["tests.foo", "tests.bar"]);
        assert!(filters.get("tests.foo").unwrap().admin.is_some());
        assert_eq!(filters.get("tests.bar").unwrap().path(), "tests-bar");
        assert_eq!(filters.len(), 2);
    }

    #[test]
    fn test_options_check() {
        let half_admin = DiscoverOptions::default().overrides(vec![OverrideEntry::WithOptions(
            "tests.withadminclass".into(),
            EntryOptions {
                admin: Some(AdminOptions::new("WithAdminClassAdmin")),
                ..EntryOptions::default()
            },
        )]);
        assert!(matches!(half_admin.check(), Err(ExtrasError::ConfigurationError(_))));

        let half_site = DiscoverOptions::default().only(vec![OverrideEntry::WithOptions(
            "tests".into(),
            EntryOptions {
                admin_site: Some(Arc::new(AdminSite::new("tests"))),
                ..EntryOptions::default()
            },
        )]);
        assert!(matches!(half_site.check(), Err(ExtrasError::ConfigurationError(_))));

        let excluding = DiscoverOptions {
            exclude: vec!["tests.foo".into()],
            ..DiscoverOptions::default()
        };
        assert!(matches!(excluding.check(), Err(ExtrasError::NotImplemented(_))));

        let paired = DiscoverOptions::default().overrides(vec![
            "tests.foo".into(),
            OverrideEntry::with_admin(
                "tests.withadminclass",
                AdminOptions::new("WithAdminClassAdmin"),
                Arc::new(AdminSite::new("tests")),
            ),
        ]);
        assert!(paired.check().is_ok());
    }
}
