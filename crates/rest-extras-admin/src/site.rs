//! Admin sites.
//!
//! An [`AdminSite`] names the site a [`ModelAdmin`](crate::ModelAdmin) is
//! instantiated against. [`AdminSite::default_site`] is the process-wide
//! site used when a caller supplies admin options without naming a site.

use std::sync::Arc;

use once_cell::sync::Lazy;

static DEFAULT_SITE: Lazy<Arc<AdminSite>> = Lazy::new(|| Arc::new(AdminSite::new("admin")));

/// An admin site.
///
/// # Examples
///
/// ```
/// use rest_extras_admin::AdminSite;
///
/// let site = AdminSite::new("tests");
/// assert_eq!(site.name(), "tests");
/// assert_eq!(AdminSite::default_site().name(), "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSite {
    name: String,
}

impl AdminSite {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the process-wide default site, named `"admin"`.
    pub fn default_site() -> Arc<Self> {
        DEFAULT_SITE.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
