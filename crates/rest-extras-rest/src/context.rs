//! The host context.
//!
//! [`HostContext`] is everything discovery, registration and request handling
//! need from the host: settings, installed apps, models, storage, the
//! content-type catalog, sessions and the authentication backend. It is built
//! once at startup and shared as `Arc<HostContext>`.

use std::sync::Arc;

use rest_extras_auth::management;
use rest_extras_auth::models::USER_MODEL;
use rest_extras_auth::{ModelBackend, SessionStore};
use rest_extras_core::apps::AppRegistry;
use rest_extras_core::{ExtrasError, ExtrasResult, Settings};
use rest_extras_db::{ContentTypeCatalog, InMemoryDatabase, Manager, ModelRegistry};

/// Shared host state.
pub struct HostContext {
    settings: Arc<Settings>,
    apps: AppRegistry,
    models: Arc<ModelRegistry>,
    db: InMemoryDatabase,
    catalog: ContentTypeCatalog,
    sessions: SessionStore,
    backend: ModelBackend,
}

impl HostContext {
    /// Builds a context over the given settings, storage and models.
    ///
    /// Fails when two `installed_apps` share a label.
    pub fn new(settings: Settings, db: InMemoryDatabase, models: ModelRegistry) -> ExtrasResult<Self> {
        let apps = AppRegistry::from_installed_apps(settings.installed_apps.as_slice())?;
        let models = Arc::new(models);
        let catalog = ContentTypeCatalog::new(db.clone());
        let backend = ModelBackend::new(models.clone(), catalog.clone());
        Ok(Self {
            settings: Arc::new(settings),
            apps,
            models,
            db,
            catalog,
            sessions: SessionStore::new(),
            backend,
        })
    }

    /// Creates tables and seeds content types and permissions.
    pub async fn migrate(&self) -> ExtrasResult<()> {
        management::migrate(&self.db, &self.models).await
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub const fn apps(&self) -> &AppRegistry {
        &self.apps
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    pub const fn db(&self) -> &InMemoryDatabase {
        &self.db
    }

    pub const fn catalog(&self) -> &ContentTypeCatalog {
        &self.catalog
    }

    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub const fn backend(&self) -> &ModelBackend {
        &self.backend
    }

    /// Returns the manager of a model, by `app_label.model_name`.
    pub fn manager(&self, model_key: &str) -> ExtrasResult<Arc<dyn Manager>> {
        self.models
            .get_by_key(model_key)
            .and_then(|class| class.objects())
            .cloned()
            .ok_or_else(|| {
                ExtrasError::ImproperlyConfigured(format!("Model '{model_key}' has no manager"))
            })
    }

    /// Returns the user manager.
    pub fn users(&self) -> ExtrasResult<Arc<dyn Manager>> {
        self.manager(USER_MODEL)
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("installed_apps", &self.settings.installed_apps)
            .field("models", &self.models.len())
            .finish_non_exhaustive()
    }
}
