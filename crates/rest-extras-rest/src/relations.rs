//! Hyperlinked relations.
//!
//! Related rows are represented as absolute detail URLs,
//! `http://{host}/{prefix}/{pk}/`. [`RouteTable`] maps model keys to the
//! router prefix that serves them, so links can be built and parsed.
//!
//! A relation whose target has no route renders as [`UNREPRESENTABLE`]
//! rather than failing the whole response.

use std::collections::HashMap;

use serde_json::Value;
use url::Url;

use rest_extras_db::manager::parse_pk;
use rest_extras_db::{ModelRegistry, Record};

use crate::serializers::{FieldKind, SerializerField};

/// Placeholder for a relation that cannot be linked.
pub const UNREPRESENTABLE: &str = "<unrepresentable>";

pub const NO_MATCH: &str = "Invalid hyperlink - No URL match.";
pub const INCORRECT_MATCH: &str = "Invalid hyperlink - Incorrect URL match.";
pub const DOES_NOT_EXIST: &str = "Invalid hyperlink - Object does not exist.";

/// Model key to router prefix, and back.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    prefixes: HashMap<String, String>,
    models: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `prefix` serves `model_key`. The first prefix registered
    /// for a model is the one links point at.
    pub fn insert(&mut self, model_key: impl Into<String>, prefix: impl Into<String>) {
        let model_key = model_key.into();
        let prefix = prefix.into();
        self.models.insert(prefix.clone(), model_key.clone());
        self.prefixes.entry(model_key).or_insert(prefix);
    }

    /// The prefix links to `model_key` point at.
    pub fn prefix_for(&self, model_key: &str) -> Option<&str> {
        self.prefixes.get(model_key).map(String::as_str)
    }

    /// The model served under `prefix`.
    pub fn model_for(&self, prefix: &str) -> Option<&str> {
        self.models.get(prefix).map(String::as_str)
    }

    /// Builds the absolute detail URL of a row.
    pub fn detail_url(&self, host: &str, model_key: &str, pk: &Value) -> Option<String> {
        let prefix = self.prefix_for(model_key)?;
        let pk = match pk {
            Value::Number(n) => n.to_string(),
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => return None,
        };
        Some(format!("http://{host}/{prefix}/{pk}/"))
    }

    /// Renders a foreign key value.
    pub fn link(&self, host: &str, model_key: &str, pk: &Value) -> Value {
        if pk.is_null() {
            return Value::Null;
        }
        Value::String(
            self.detail_url(host, model_key, pk)
                .unwrap_or_else(|| UNREPRESENTABLE.to_string()),
        )
    }

    /// Renders a many-to-many value.
    pub fn links(&self, host: &str, model_key: &str, pks: &Value) -> Value {
        match pks {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|pk| self.link(host, model_key, pk))
                    .collect(),
            ),
            _ => Value::Array(Vec::new()),
        }
    }

    /// Resolves a hyperlink to the primary key of an existing `model_key` row.
    ///
    /// Only the path is matched; the scheme and host are ignored. Relative
    /// paths are accepted.
    pub async fn resolve(
        &self,
        host: &str,
        model_key: &str,
        link: &Value,
        models: &ModelRegistry,
    ) -> Result<Value, String> {
        let Value::String(link) = link else {
            return Err(format!(
                "Incorrect type. Expected URL string, received {}.",
                json_type_name(link)
            ));
        };
        let base = Url::parse(&format!("http://{host}/")).map_err(|_| NO_MATCH.to_string())?;
        let url = base.join(link).map_err(|_| NO_MATCH.to_string())?;
        let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();
        let [prefix, raw_pk] = segments.as_slice() else {
            return Err(NO_MATCH.to_string());
        };
        let Some(served) = self.model_for(prefix) else {
            return Err(NO_MATCH.to_string());
        };
        if served != model_key {
            return Err(INCORRECT_MATCH.to_string());
        }
        let pk = parse_pk(raw_pk).ok_or_else(|| DOES_NOT_EXIST.to_string())?;
        let manager = models
            .get_by_key(model_key)
            .and_then(|class| class.objects())
            .ok_or_else(|| DOES_NOT_EXIST.to_string())?;
        match manager.exists(&pk).await {
            Ok(true) => Ok(pk),
            _ => Err(DOES_NOT_EXIST.to_string()),
        }
    }
}

/// Replaces related rows with their primary keys.
///
/// Only relation fields are touched; a row (an object carrying the target's
/// primary key) or a list of rows becomes a key or a list of keys. Every
/// other value, JSON objects included, passes through unchanged.
pub fn normalize_relations(attrs: &Record, fields: &[SerializerField], models: &ModelRegistry) -> Record {
    attrs
        .iter()
        .map(|(name, value)| {
            let target = fields.iter().find(|f| f.name == *name).and_then(|f| match &f.kind {
                FieldKind::Related { to } | FieldKind::ManyRelated { to, .. } => Some(to.as_str()),
                _ => None,
            });
            let normalized = match target {
                Some(to) => {
                    let pk_name = models.get_by_key(to).map_or("id", |class| class.meta.pk_name());
                    to_pk(value, pk_name)
                }
                None => value.clone(),
            };
            (name.clone(), normalized)
        })
        .collect()
}

fn to_pk(value: &Value, pk_name: &str) -> Value {
    match value {
        Value::Object(row) => row.get(pk_name).cloned().unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.iter().map(|item| to_pk(item, pk_name)).collect()),
        other => other.clone(),
    }
}

/// The name a JSON type is reported under in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use rest_extras_db::{InMemoryDatabase, ModelMeta};

    use super::*;

    fn routes() -> RouteTable {
        let mut routes = RouteTable::new();
        routes.insert("tests.bar", "tests-bar");
        routes.insert("tests.foo", "tests-foo");
        routes
    }

    async fn models() -> ModelRegistry {
        let db = InMemoryDatabase::new();
        let mut registry = ModelRegistry::new();
        registry.register(db.model_class(ModelMeta::new("tests", "Bar"))).unwrap();
        registry.register(db.model_class(ModelMeta::new("tests", "Foo"))).unwrap();
        db.migrate(&registry).await.unwrap();
        let bars = registry.get("tests", "bar").unwrap().objects().unwrap().clone();
        bars.create(Record::new()).await.unwrap();
        registry
    }

    #[test]
    fn test_links() {
        let routes = routes();
        assert_eq!(routes.link("testserver", "tests.foo", &json!(1)), json!("http://testserver/tests-foo/1/"));
        assert_eq!(routes.link("testserver", "tests.foo", &Value::Null), Value::Null);
        assert_eq!(routes.link("testserver", "tests.unrouted", &json!(1)), json!(UNREPRESENTABLE));
        assert_eq!(
            routes.links("testserver", "tests.bar", &json!([1, 2])),
            json!(["http://testserver/tests-bar/1/", "http://testserver/tests-bar/2/"])
        );
    }

    #[tokio::test]
    async fn test_resolve() {
        let routes = routes();
        let models = models().await;
        let resolve = |link: Value| {
            let routes = routes.clone();
            let models = models.clone();
            async move { routes.resolve("testserver", "tests.bar", &link, &models).await }
        };

        assert_eq!(resolve(json!("http://testserver/tests-bar/1/")).await, Ok(json!(1)));
        assert_eq!(resolve(json!("/tests-bar/1/")).await, Ok(json!(1)));
        assert_eq!(resolve(json!("http://elsewhere/tests-bar/1/")).await, Ok(json!(1)));
        assert_eq!(resolve(json!("http://testserver/nope/1/")).await, Err(NO_MATCH.to_string()));
        assert_eq!(resolve(json!("http://testserver/tests-bar/")).await, Err(NO_MATCH.to_string()));
        assert_eq!(resolve(json!("http://testserver/tests-foo/1/")).await, Err(INCORRECT_MATCH.to_string()));
        assert_eq!(resolve(json!("http://testserver/tests-bar/9/")).await, Err(DOES_NOT_EXIST.to_string()));
        assert_eq!(
            resolve(json!(1)).await,
            Err("Incorrect type. Expected URL string, received int.".to_string())
        );
    }

    #[tokio::test]
    async fn test_normalize_relations_touches_only_relations() {
        let models = models().await;
        let fields = vec![
            SerializerField::new("foreign_field", FieldKind::Related { to: "tests.foo".into() }),
            SerializerField::new(
                "many_field",
                FieldKind::ManyRelated {
                    to: "tests.bar".into(),
                    allow_empty: false,
                },
            ),
            SerializerField::new("payload", FieldKind::Json),
            SerializerField::new("tags", FieldKind::Json),
        ];
        let attrs = json!({
            "foreign_field": {"id": 1, "name": "foo"},
            "many_field": [{"id": 1}, 2],
            "payload": {"id": 7, "name": "x"},
            "tags": [{"id": 1}],
            "editable_field": "x",
        });
        let normalized = normalize_relations(attrs.as_object().unwrap(), &fields, &models);
        assert_eq!(
            Value::Object(normalized),
            json!({
                "foreign_field": 1,
                "many_field": [1, 2],
                "payload": {"id": 7, "name": "x"},
                "tags": [{"id": 1}],
                "editable_field": "x",
            })
        );
    }
}
