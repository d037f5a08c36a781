//! Admin classes.
//!
//! [`AdminOptions`] is the declarative part of a Django `ModelAdmin`
//! subclass: `fields`, `exclude`, `readonly_fields` and a base `form`.
//! [`ModelAdmin`] binds those options to a model and a site, and builds the
//! form class the admin would use for a given user and object.

use std::sync::Arc;

use rest_extras_auth::CurrentUser;
use rest_extras_db::{ModelMeta, Record};
use rest_extras_forms::{FormClass, ModelFormClass};

use crate::site::AdminSite;

/// Declarative admin configuration for a model.
#[derive(Debug, Clone, Default)]
pub struct AdminOptions {
    /// The admin class name.
    pub name: String,
    /// Fields shown in the form. `None` means the form's own fields.
    pub fields: Option<Vec<String>>,
    /// Fields left out of the form.
    pub exclude: Vec<String>,
    /// Fields shown but never editable; they are left out of the form.
    pub readonly_fields: Vec<String>,
    /// The base form class. Defaults to a plain model form.
    pub form: Option<ModelFormClass>,
}

impl AdminOptions {
    /// Creates options with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the form fields.
    #[must_use]
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(ToString::to_string).collect());
        self
    }

    /// Sets the excluded fields.
    #[must_use]
    pub fn exclude(mut self, fields: &[&str]) -> Self {
        self.exclude = fields.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the read-only fields.
    #[must_use]
    pub fn readonly_fields(mut self, fields: &[&str]) -> Self {
        self.readonly_fields = fields.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the base form class.
    #[must_use]
    pub fn form(mut self, form: ModelFormClass) -> Self {
        self.form = Some(form);
        self
    }
}

/// Admin options instantiated for one model on one site.
#[derive(Debug, Clone)]
pub struct ModelAdmin {
    meta: Arc<ModelMeta>,
    options: AdminOptions,
    site: Arc<AdminSite>,
}

impl ModelAdmin {
    /// Binds admin options to a model and a site.
    pub const fn new(meta: Arc<ModelMeta>, options: AdminOptions, site: Arc<AdminSite>) -> Self {
        Self { meta, options, site }
    }

    /// The model this admin manages.
    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// The site this admin belongs to.
    pub fn site(&self) -> &Arc<AdminSite> {
        &self.site
    }

    /// The admin options.
    pub const fn options(&self) -> &AdminOptions {
        &self.options
    }

    /// Returns the read-only fields for this user and object.
    pub fn get_readonly_fields(&self, _user: &CurrentUser, _obj: Option<&Record>) -> Vec<String> {
        self.options.readonly_fields.clone()
    }

    /// Builds the form class for adding (`obj` is `None`) or changing a row.
    ///
    /// Starts from the configured form (or a plain model form), restricts it
    /// to `fields` when given, and excludes `exclude` plus the read-only
    /// fields. Declared form fields are kept.
    pub fn get_form(&self, user: &CurrentUser, obj: Option<&Record>) -> Arc<dyn FormClass> {
        let name = format!("{}Form", self.meta.object_name);
        let mut form = self.options.form.clone().map_or_else(
            || ModelFormClass::new(name.clone(), self.meta.clone()),
            |base| base.named(name.clone()),
        );
        if let Some(fields) = &self.options.fields {
            form = form.fields(fields.iter().cloned());
        }
        let exclude = self
            .options
            .exclude
            .iter()
            .cloned()
            .chain(self.get_readonly_fields(user, obj));
        form = form.exclude(exclude);
        tracing::debug!(admin = %self.options.name, site = self.site.name(), form = %name, "built admin form");
        Arc::new(form)
    }
}

#[cfg(test)]
mod tests {
    use rest_extras_db::FieldDef;
    use rest_extras_forms::FormFieldDef;

    use super::*;

    fn meta() -> Arc<ModelMeta> {
        Arc::new(
            ModelMeta::new("tests", "WithAdminClass")
                .field(FieldDef::char("editable_field", 32))
                .field(FieldDef::char("another_editable_field", 32))
                .field(FieldDef::foreign_key("foreign_field", "tests.foo"))
                .field(FieldDef::many_to_many("many_field", "tests.bar")),
        )
    }

    fn field_names(admin: &ModelAdmin) -> Vec<String> {
        let class = admin.get_form(&CurrentUser::Anonymous, None);
        let model = class.model().unwrap();
        assert_eq!(model.model_key(), "tests.withadminclass");
        let registry = Arc::new(rest_extras_db::ModelRegistry::new());
        let form = class.construct(rest_extras_forms::FormInit::new(Record::new(), registry));
        form.field_names().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_default_form_has_all_editable_fields() {
        let admin = ModelAdmin::new(meta(), AdminOptions::new("A"), AdminSite::default_site());
        assert_eq!(
            field_names(&admin),
            vec!["editable_field", "another_editable_field", "foreign_field", "many_field"]
        );
        assert_eq!(admin.get_form(&CurrentUser::Anonymous, None).name(), "WithAdminClassForm");
    }

    #[test]
    fn test_fields_exclude_and_readonly() {
        let options = AdminOptions::new("A")
            .fields(&["editable_field", "another_editable_field", "foreign_field"])
            .exclude(&["foreign_field"])
            .readonly_fields(&["another_editable_field"]);
        let admin = ModelAdmin::new(meta(), options, Arc::new(AdminSite::new("tests")));
        assert_eq!(field_names(&admin), vec!["editable_field"]);
    }

    #[test]
    fn test_base_form_declared_fields_are_kept() {
        let base = ModelFormClass::new("Base", meta()).declare(FormFieldDef::integer("an_integer"));
        let options = AdminOptions::new("A").form(base).fields(&["editable_field"]);
        let admin = ModelAdmin::new(meta(), options, AdminSite::default_site());
        assert_eq!(field_names(&admin), vec!["editable_field", "an_integer"]);
    }
}
