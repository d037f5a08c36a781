//! The test application.
//!
//! Models of the `tests` app, all concrete ones except `Bar` and `Foo`
//! sharing the abstract [`base_meta`]:
//!
//! | Model | Wiring |
//! |---|---|
//! | `tests.bar`, `tests.foo` | plain |
//! | `tests.vanilla` | plain |
//! | `tests.withform` | `WithFormForm` |
//! | `tests.withtrickyform` | `WithTrickyFormForm`, which adds a required `an_integer` |
//! | `tests.withadminclass` | `WithAdminClassAdmin` on the `tests` admin site |
//! | `tests.withoutmanager` | no manager, never routed |
//!
//! [`build_test_app`] migrates, seeds three users (`superuser`, `staff`,
//! `user`, all with password `password`) and one row per model, then
//! discovers everything and registers the user endpoint.

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use rest_extras_admin::log_entry::log_entry_meta;
use rest_extras_admin::{AdminOptions, AdminSite};
use rest_extras_auth::user::{create_superuser, create_user};
use rest_extras_auth::{models, User};
use rest_extras_core::{ExtrasResult, Settings};
use rest_extras_db::{FieldDef, InMemoryDatabase, ModelClass, ModelMeta, ModelRegistry, Record};
use rest_extras_forms::{FormClass, FormFieldDef, ModelFormClass};
use rest_extras_rest::{discover, users, DefaultRouter, DiscoverOptions, HostContext, OverrideEntry};

pub const PASSWORD: &str = "password";

/// The abstract base of the form and admin test models.
pub fn base_meta() -> ModelMeta {
    ModelMeta::new_abstract("tests", "Base")
        .field(FieldDef::char("editable_field", 32))
        .field(FieldDef::char("another_editable_field", 32))
        .field(FieldDef::char("non_editable_field", 32).not_editable())
        .field(FieldDef::foreign_key("foreign_field", "tests.foo"))
        .field(FieldDef::many_to_many("many_field", "tests.bar"))
}

fn concrete(object_name: &str) -> ModelMeta {
    ModelMeta::new("tests", object_name).extends(&base_meta())
}

/// Every model of the `tests` app, in declaration order.
pub fn test_models() -> Vec<ModelMeta> {
    vec![
        ModelMeta::new("tests", "Bar"),
        ModelMeta::new("tests", "Foo"),
        concrete("Vanilla"),
        concrete("WithForm"),
        concrete("WithTrickyForm"),
        concrete("WithAdminClass"),
    ]
}

/// Settings with the `tests` app installed.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.installed_apps.push("rest_framework_extras.tests".to_string());
    settings
}

/// Registers the host and test models on `db`.
pub fn test_registry(db: &InMemoryDatabase) -> ExtrasResult<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    for meta in models::all() {
        registry.register(db.model_class(meta))?;
    }
    registry.register(db.model_class(log_entry_meta()))?;
    for meta in test_models() {
        registry.register(db.model_class(meta))?;
    }
    registry.register(ModelClass::unmanaged(Arc::new(concrete("WithoutManager"))))?;
    Ok(registry)
}

/// A migrated context over the test settings and models, without rows.
pub async fn test_context() -> ExtrasResult<Arc<HostContext>> {
    let db = InMemoryDatabase::new();
    let registry = test_registry(&db)?;
    let ctx = HostContext::new(test_settings(), db, registry)?;
    ctx.migrate().await?;
    Ok(Arc::new(ctx))
}

fn meta_of(ctx: &HostContext, key: &str) -> ExtrasResult<Arc<ModelMeta>> {
    ctx.models()
        .get_by_key(key)
        .map(|class| Arc::clone(&class.meta))
        .ok_or_else(|| rest_extras_core::ExtrasError::ImproperlyConfigured(format!("no model '{key}'")))
}

pub fn with_form_form(ctx: &HostContext) -> ExtrasResult<Arc<dyn FormClass>> {
    Ok(Arc::new(ModelFormClass::new("WithFormForm", meta_of(ctx, "tests.withform")?)))
}

pub fn with_tricky_form_form(ctx: &HostContext) -> ExtrasResult<Arc<dyn FormClass>> {
    Ok(Arc::new(
        ModelFormClass::new("WithTrickyFormForm", meta_of(ctx, "tests.withtrickyform")?)
            .declare(FormFieldDef::integer("an_integer")),
    ))
}

pub fn with_admin_class_admin() -> AdminOptions {
    AdminOptions::new("WithAdminClassAdmin")
}

/// The overrides the test URL setup discovers with.
pub fn test_overrides(ctx: &HostContext, site: &Arc<AdminSite>) -> ExtrasResult<Vec<OverrideEntry>> {
    Ok(vec![
        OverrideEntry::with_form("tests.withform", with_form_form(ctx)?),
        OverrideEntry::with_form("tests.withtrickyform", with_tricky_form_form(ctx)?),
        OverrideEntry::with_admin("tests.withadminclass", with_admin_class_admin(), Arc::clone(site)),
    ])
}

/// The seeded users.
#[derive(Debug, Clone)]
pub struct TestUsers {
    pub superuser: User,
    pub staff: User,
    pub user: User,
}

pub async fn seed_users(ctx: &HostContext) -> ExtrasResult<TestUsers> {
    let users = ctx.users()?;
    let email = |name: &str| -> Record {
        let mut extra = Record::new();
        extra.insert("email".into(), Value::String(format!("{name}@test.com")));
        extra
    };
    let superuser = create_superuser(users.as_ref(), "superuser", PASSWORD, email("superuser")).await?;
    let mut staff_extra = email("staff");
    staff_extra.insert("is_staff".into(), Value::Bool(true));
    let staff = create_user(users.as_ref(), "staff", PASSWORD, staff_extra).await?;
    let user = create_user(users.as_ref(), "user", PASSWORD, email("user")).await?;
    Ok(TestUsers { superuser, staff, user })
}

/// Seeds one `Bar`, one `Foo` and one row of each base model pointing at them.
pub async fn seed_rows(ctx: &HostContext) -> ExtrasResult<()> {
    for key in ["tests.bar", "tests.foo"] {
        ctx.manager(key)?.create(Record::new()).await?;
    }
    for key in ["tests.vanilla", "tests.withform", "tests.withtrickyform", "tests.withadminclass"] {
        let row = json!({
            "editable_field": "editable_field",
            "another_editable_field": "another_editable_field",
            "foreign_field": 1,
            "many_field": [1],
        });
        if let Value::Object(row) = row {
            ctx.manager(key)?.create(row).await?;
        }
    }
    Ok(())
}

/// The fully wired test application.
pub struct TestApp {
    pub ctx: Arc<HostContext>,
    pub registry: DefaultRouter,
    pub router: Router,
    pub admin_site: Arc<AdminSite>,
    pub users: TestUsers,
}

impl std::fmt::Debug for TestApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestApp")
            .field("ctx", &self.ctx)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

pub async fn build_test_app() -> ExtrasResult<TestApp> {
    let ctx = test_context().await?;
    let users = seed_users(&ctx).await?;
    seed_rows(&ctx).await?;

    let admin_site = Arc::new(AdminSite::new("tests"));

    let mut registry = DefaultRouter::new();
    let options = DiscoverOptions::default().overrides(test_overrides(&ctx, &admin_site)?);
    discover(&mut registry, &ctx, &options).await?;
    users::register(&mut registry, &ctx, None)?;

    let router = registry.urls(Arc::clone(&ctx));
    Ok(TestApp {
        ctx,
        registry,
        router,
        admin_site,
        users,
    })
}

/// The representation every seeded row has, at `http://testserver/tests-{model}/{pk}/`.
pub fn control(model: &str, pk: i64, another_editable_field_suffix: &str) -> Value {
    json!({
        "url": format!("http://testserver/tests-{model}/{pk}/"),
        "editable_field": "editable_field",
        "another_editable_field": format!("another_editable_field{another_editable_field_suffix}"),
        "non_editable_field": "",
        "foreign_field": "http://testserver/tests-foo/1/",
        "many_field": ["http://testserver/tests-bar/1/"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_test_app() {
        let app = build_test_app().await.unwrap();
        assert_eq!(app.users.superuser.id, 1);
        assert!(app.users.staff.is_staff);
        assert!(!app.users.user.is_staff);
        assert!(app.registry.get("tests-vanilla").is_some());
        assert!(app.registry.get("tests-withoutmanager").is_none());
        assert!(app.registry.get("auth-user").is_some());
        assert_eq!(app.admin_site.name(), "tests");
    }
}
