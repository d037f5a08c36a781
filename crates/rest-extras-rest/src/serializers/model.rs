//! Serializers generated from model metadata.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult, ValidationError};
use rest_extras_db::manager::{normalize_pk, record_pk};
use rest_extras_db::{Manager, ModelMeta, Record};

use super::fields::{not_a_list, FieldKind, SerializerField, EMPTY_LIST, NULL, REQUIRED};
use super::{Serializer, SerializerContext};
use crate::request::RequestData;

/// Which model fields a serializer exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSelection {
    /// `url` followed by every model field except the primary key.
    #[default]
    All,
    /// Exactly these, in this order. `url` may be named.
    Only(Vec<String>),
}

/// How a [`ModelSerializer`] is built.
#[derive(Debug, Clone, Default)]
pub struct SerializerOptions {
    pub name: String,
    pub fields: FieldSelection,
    /// Replace the generated field of the same name, or add a new one.
    pub declared: Vec<SerializerField>,
    pub read_only_fields: Vec<String>,
}

impl SerializerOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn only(mut self, fields: &[&str]) -> Self {
        self.fields = FieldSelection::Only(fields.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn declare(mut self, field: SerializerField) -> Self {
        self.declared.retain(|f| f.name != field.name);
        self.declared.push(field);
        self
    }

    #[must_use]
    pub fn read_only(mut self, fields: &[&str]) -> Self {
        self.read_only_fields.extend(fields.iter().map(ToString::to_string));
        self
    }

    /// Resolves the field list for a model.
    pub fn build_fields(&self, meta: &ModelMeta) -> ExtrasResult<Vec<SerializerField>> {
        let declared = |name: &str| self.declared.iter().find(|f| f.name == name).cloned();
        let mut fields = Vec::new();
        match &self.fields {
            FieldSelection::All => {
                fields.push(declared("url").unwrap_or_else(SerializerField::url));
                for model_field in &meta.fields {
                    let field = declared(&model_field.name)
                        .or_else(|| SerializerField::from_model_field(model_field));
                    fields.extend(field);
                }
                for extra in &self.declared {
                    if !fields.iter().any(|f| f.name == extra.name) {
                        fields.push(extra.clone());
                    }
                }
            }
            FieldSelection::Only(names) => {
                for name in names {
                    let field = declared(name)
                        .or_else(|| (name == "url").then(SerializerField::url))
                        .or_else(|| meta.get_field(name).and_then(SerializerField::from_model_field))
                        .ok_or_else(|| {
                            ExtrasError::ImproperlyConfigured(format!(
                                "Field name `{name}` is not valid for model `{}`.",
                                meta.object_name
                            ))
                        })?;
                    fields.push(field);
                }
            }
        }
        for field in &mut fields {
            if self.read_only_fields.contains(&field.name) && !field.read_only {
                *field = field.clone().read_only();
            }
        }
        Ok(fields)
    }
}

fn capfirst(text: &str) -> String {
    let mut chars = text.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// A serializer over one model's rows.
///
/// Relations are rendered and accepted as hyperlinks. Saving writes through
/// the model's manager.
pub struct ModelSerializer {
    name: String,
    meta: Arc<ModelMeta>,
    manager: Arc<dyn Manager>,
    fields: Vec<SerializerField>,
    instance: Option<Record>,
    context: SerializerContext,
}

impl std::fmt::Debug for ModelSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSerializer")
            .field("name", &self.name)
            .field("model", &self.meta.model_key())
            .field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ModelSerializer {
    pub fn new(
        meta: Arc<ModelMeta>,
        manager: Arc<dyn Manager>,
        options: &SerializerOptions,
        context: SerializerContext,
    ) -> ExtrasResult<Self> {
        let fields = options.build_fields(&meta)?;
        let name = if options.name.is_empty() {
            format!("{}Serializer", meta.object_name)
        } else {
            options.name.clone()
        };
        Ok(Self {
            name,
            meta,
            manager,
            fields,
            instance: None,
            context,
        })
    }

    #[must_use]
    pub fn with_instance(mut self, instance: Option<Record>) -> Self {
        self.instance = instance;
        self
    }

    pub const fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    pub const fn context(&self) -> &SerializerContext {
        &self.context
    }

    pub fn set_instance(&mut self, instance: Record) {
        self.instance = Some(instance);
    }

    pub fn field(&self, name: &str) -> Option<&SerializerField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field-level validation: every writable field in turn, then the
    /// uniqueness checks.
    pub async fn validate_fields(&self, data: &RequestData) -> ExtrasResult<Record> {
        let attrs = self.to_internal_value(data).await?;
        self.run_unique_validators(&attrs).await?;
        Ok(attrs)
    }

    async fn to_internal_value(&self, data: &RequestData) -> ExtrasResult<Record> {
        let partial = self.context.partial;
        let mut attrs = Record::new();
        let mut errors: HashMap<String, Vec<String>> = HashMap::new();

        for field in self.fields.iter().filter(|f| !f.read_only) {
            let absent = || {
                if data.html_input {
                    field.html_absent_value(partial)
                } else {
                    None
                }
            };
            let Some(value) = data.get(&field.name).cloned().or_else(absent) else {
                if field.required && !partial {
                    errors.insert(field.name.clone(), vec![REQUIRED.to_string()]);
                }
                continue;
            };
            match self.field_value(field, value, data.html_input).await {
                Ok(value) => {
                    attrs.insert(field.name.clone(), value);
                }
                Err(messages) => {
                    errors.insert(field.name.clone(), messages);
                }
            }
        }

        if errors.is_empty() {
            Ok(attrs)
        } else {
            Err(ValidationError::from_messages(&errors).into())
        }
    }

    async fn field_value(
        &self,
        field: &SerializerField,
        value: Value,
        html_input: bool,
    ) -> Result<Value, Vec<String>> {
        let empty_string = value.as_str() == Some("");
        let blank_text = matches!(
            field.kind,
            FieldKind::Char { allow_blank: true, .. } | FieldKind::Email { allow_blank: true, .. }
        );
        let value = match field.kind {
            FieldKind::Related { .. } if empty_string => Value::Null,
            _ if html_input && empty_string && field.allow_null && !blank_text => Value::Null,
            FieldKind::ManyRelated { .. } if html_input && value.is_string() => Value::Array(vec![value]),
            _ => value,
        };
        if value.is_null() {
            return if field.allow_null {
                Ok(Value::Null)
            } else {
                Err(vec![NULL.to_string()])
            };
        }

        let SerializerContext {
            host,
            routes,
            models,
            ..
        } = &self.context;
        match &field.kind {
            FieldKind::Related { to } => routes
                .resolve(host, to, &value, models)
                .await
                .map_err(|msg| vec![msg]),
            FieldKind::ManyRelated { to, allow_empty } => {
                let Value::Array(items) = &value else {
                    return Err(vec![not_a_list(&value)]);
                };
                if items.is_empty() && !allow_empty {
                    return Err(vec![EMPTY_LIST.to_string()]);
                }
                let mut pks = Vec::with_capacity(items.len());
                for item in items {
                    pks.push(routes.resolve(host, to, item, models).await.map_err(|msg| vec![msg])?);
                }
                Ok(Value::Array(pks))
            }
            _ => field.to_internal_value(&value, html_input).map_err(|msg| vec![msg]),
        }
    }

    async fn run_unique_validators(&self, attrs: &Record) -> ExtrasResult<()> {
        let own_pk = self
            .instance
            .as_ref()
            .and_then(|row| record_pk(&self.meta, row))
            .and_then(normalize_pk);
        let mut errors: HashMap<String, Vec<String>> = HashMap::new();
        for field in self.fields.iter().filter(|f| f.unique) {
            let Some(value) = attrs.get(&field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .manager
                .filter(&field.name, value)
                .await?
                .iter()
                .any(|row| record_pk(&self.meta, row).and_then(normalize_pk) != own_pk);
            if taken {
                let label = self
                    .meta
                    .get_field(&field.name)
                    .map_or(field.name.as_str(), |f| f.verbose_name.as_str());
                errors.insert(
                    field.name.clone(),
                    vec![format!(
                        "{} with this {label} already exists.",
                        capfirst(&self.meta.verbose_name)
                    )],
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_messages(&errors).into())
        }
    }

    pub async fn create(&self, validated: Record) -> ExtrasResult<Record> {
        self.manager.create(validated).await
    }

    pub async fn update(&self, instance: &Record, validated: Record) -> ExtrasResult<Record> {
        let pk = record_pk(&self.meta, instance)
            .cloned()
            .ok_or_else(|| self.manager.does_not_exist())?;
        self.manager.update(&pk, validated).await
    }
}

#[async_trait]
impl Serializer for ModelSerializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[SerializerField] {
        &self.fields
    }

    fn instance(&self) -> Option<&Record> {
        self.instance.as_ref()
    }

    async fn run_validation(&mut self, data: &RequestData) -> ExtrasResult<Record> {
        let attrs = self.validate_fields(data).await?;
        self.validate(attrs).await
    }

    async fn save(&mut self, validated: Record) -> ExtrasResult<Record> {
        let saved = match &self.instance {
            Some(instance) => self.update(instance, validated).await?,
            None => self.create(validated).await?,
        };
        self.instance = Some(saved.clone());
        Ok(saved)
    }

    fn to_representation(&self, instance: &Record) -> Value {
        let SerializerContext { host, routes, .. } = &self.context;
        let mut out = Record::new();
        for field in self.fields.iter().filter(|f| !f.write_only) {
            let raw = instance.get(&field.name).unwrap_or(&Value::Null);
            let value = match &field.kind {
                FieldKind::Url => record_pk(&self.meta, instance)
                    .map_or(Value::Null, |pk| routes.link(host, &self.meta.model_key(), pk)),
                FieldKind::Related { to } => routes.link(host, to, raw),
                FieldKind::ManyRelated { to, .. } => routes.links(host, to, raw),
                _ => raw.clone(),
            };
            out.insert(field.name.clone(), value);
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::json;

    use rest_extras_auth::CurrentUser;
    use rest_extras_db::{FieldDef, FieldType, InMemoryDatabase, ModelRegistry};

    use super::*;
    use crate::relations::RouteTable;

    struct Fixture {
        models: Arc<ModelRegistry>,
        routes: Arc<RouteTable>,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = InMemoryDatabase::new();
            let mut models = ModelRegistry::new();
            models.register(db.model_class(ModelMeta::new("tests", "Bar"))).unwrap();
            models.register(db.model_class(ModelMeta::new("tests", "Foo"))).unwrap();
            models
                .register(db.model_class(
                    ModelMeta::new("tests", "Vanilla")
                        .field(FieldDef::char("editable_field", 32))
                        .field(FieldDef::char("another_editable_field", 32))
                        .field(FieldDef::char("non_editable_field", 32).not_editable().default(""))
                        .field(FieldDef::foreign_key("foreign_field", "tests.foo"))
                        .field(FieldDef::many_to_many("many_field", "tests.bar"))
                        .field(FieldDef::new("flag", FieldType::BooleanField).default(false)),
                ))
                .unwrap();
            models
                .register(db.model_class(ModelMeta::new("tests", "Tag").field(FieldDef::char("slug", 16).unique())))
                .unwrap();
            db.migrate(&models).await.unwrap();
            for key in ["tests.bar", "tests.foo"] {
                models.get_by_key(key).unwrap().objects().unwrap().create(Record::new()).await.unwrap();
            }
            let mut routes = RouteTable::new();
            for key in ["tests.bar", "tests.foo", "tests.vanilla", "tests.tag"] {
                routes.insert(key, key.replace('.', "-"));
            }
            Self {
                models: Arc::new(models),
                routes: Arc::new(routes),
            }
        }

        fn serializer(&self, key: &str, partial: bool) -> ModelSerializer {
            let class = self.models.get_by_key(key).unwrap();
            let context = SerializerContext {
                host: "testserver".into(),
                routes: Arc::clone(&self.routes),
                models: Arc::clone(&self.models),
                user: CurrentUser::Anonymous,
                method: if partial { Method::PATCH } else { Method::POST },
                partial,
            };
            ModelSerializer::new(
                Arc::clone(&class.meta),
                Arc::clone(class.objects().unwrap()),
                &SerializerOptions::default(),
                context,
            )
            .unwrap()
        }
    }

    fn data(value: Value, html_input: bool) -> RequestData {
        RequestData {
            values: value.as_object().unwrap().clone(),
            html_input,
        }
    }

    #[test]
    fn test_build_fields() {
        let meta = ModelMeta::new("tests", "Vanilla").field(FieldDef::char("title", 10));
        let names = |fields: Vec<SerializerField>| fields.into_iter().map(|f| f.name).collect::<Vec<_>>();

        assert_eq!(names(SerializerOptions::default().build_fields(&meta).unwrap()), vec!["url", "title"]);
        assert_eq!(
            names(SerializerOptions::default().only(&["title"]).build_fields(&meta).unwrap()),
            vec!["title"]
        );
        assert!(SerializerOptions::default().only(&["nope"]).build_fields(&meta).is_err());

        let fields = SerializerOptions::default()
            .declare(SerializerField::char("password", None, true).write_only())
            .read_only(&["title"])
            .build_fields(&meta)
            .unwrap();
        assert_eq!(names(fields.clone()), vec!["url", "title", "password"]);
        assert!(fields[1].read_only);
        assert!(fields[2].write_only);
    }

    #[tokio::test]
    async fn test_create_from_form_data() {
        let fixture = Fixture::new().await;
        let mut serializer = fixture.serializer("tests.vanilla", false);
        let attrs = serializer
            .run_validation(&data(
                json!({
                    "editable_field": "editable_field",
                    "another_editable_field": "another_editable_field",
                    "foreign_field": "http://testserver/tests-foo/1/",
                    "many_field": "http://testserver/tests-bar/1/",
                }),
                true,
            ))
            .await
            .unwrap();
        assert_eq!(attrs["many_field"], json!([1]));
        assert_eq!(attrs["flag"], json!(false));

        let saved = serializer.save(attrs).await.unwrap();
        assert_eq!(
            serializer.to_representation(&saved),
            json!({
                "url": "http://testserver/tests-vanilla/1/",
                "editable_field": "editable_field",
                "another_editable_field": "another_editable_field",
                "non_editable_field": "",
                "foreign_field": "http://testserver/tests-foo/1/",
                "many_field": ["http://testserver/tests-bar/1/"],
                "flag": false,
            })
        );
    }

    #[tokio::test]
    async fn test_field_errors() {
        let fixture = Fixture::new().await;
        let mut serializer = fixture.serializer("tests.vanilla", false);
        let err = serializer
            .run_validation(&data(
                json!({
                    "editable_field": "",
                    "foreign_field": "http://testserver/tests-bar/1/",
                    "many_field": "http://testserver/tests-bar/1/",
                }),
                false,
            ))
            .await
            .unwrap_err();
        let ExtrasError::ValidationError(err) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(
            err.to_json(),
            json!({
                "editable_field": ["This field may not be blank."],
                "another_editable_field": ["This field is required."],
                "foreign_field": ["Invalid hyperlink - Incorrect URL match."],
                "many_field": ["Expected a list of items but got type \"str\"."],
            })
        );
    }

    #[tokio::test]
    async fn test_partial_skips_missing_fields() {
        let fixture = Fixture::new().await;
        let mut serializer = fixture.serializer("tests.vanilla", true);
        let attrs = serializer
            .run_validation(&data(json!({"editable_field": "changed"}), true))
            .await
            .unwrap();
        assert_eq!(Value::Object(attrs), json!({"editable_field": "changed"}));
    }

    #[tokio::test]
    async fn test_unique_validator() {
        let fixture = Fixture::new().await;
        let mut first = fixture.serializer("tests.tag", false);
        let attrs = first.run_validation(&data(json!({"slug": "rust"}), false)).await.unwrap();
        let saved = first.save(attrs).await.unwrap();

        let mut second = fixture.serializer("tests.tag", false);
        let err = second.run_validation(&data(json!({"slug": "rust"}), false)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("Tag with this slug already exists."));

        let mut same_row = fixture.serializer("tests.tag", false).with_instance(Some(saved));
        assert!(same_row.run_validation(&data(json!({"slug": "rust"}), false)).await.is_ok());
    }
}
