//! Content types framework.
//!
//! A [`ContentType`] identifies a model by app label and model name. The
//! [`ContentTypeCatalog`] reads them from the `contenttypes.contenttype` table,
//! so it is only queryable once the host storage has been migrated; before
//! that every query fails with `OperationalError`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult};

use crate::fields::FieldDef;
use crate::manager::Record;
use crate::memory::InMemoryDatabase;
use crate::model::ModelMeta;
use crate::registry::{ModelClass, ModelRegistry};

/// Model key of the content type table.
pub const CONTENT_TYPE_MODEL: &str = "contenttypes.contenttype";

/// Returns the metadata of the `contenttypes.ContentType` model.
pub fn content_type_meta() -> ModelMeta {
    ModelMeta::new("contenttypes", "ContentType")
        .verbose_name("content type")
        .field(FieldDef::char("app_label", 100))
        .field(FieldDef::char("model", 100))
}

/// Represents a model's content type.
///
/// # Examples
///
/// ```
/// use rest_extras_db::contenttypes::ContentType;
///
/// let ct = ContentType::new(1, "tests", "vanilla");
/// assert_eq!(ct.natural_key(), ("tests".to_string(), "vanilla".to_string()));
/// assert_eq!(ct.model_key(), "tests.vanilla");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentType {
    /// The primary key of the content type row.
    pub id: i64,
    /// The application label (e.g., "tests", "auth").
    pub app_label: String,
    /// The model name in lowercase (e.g., "vanilla", "user").
    pub model: String,
}

impl ContentType {
    /// Creates a new content type.
    pub fn new(id: i64, app_label: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id,
            app_label: app_label.into(),
            model: model.into(),
        }
    }

    /// Reads a content type from a stored row.
    pub fn from_record(record: &Record) -> ExtrasResult<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| ExtrasError::SerializationError(format!("Invalid content type row: {e}")))
    }

    /// Returns the natural key as a tuple of (`app_label`, `model_name`).
    pub fn natural_key(&self) -> (String, String) {
        (self.app_label.clone(), self.model.clone())
    }

    /// Returns the model identifier in `"app_label.model"` format.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {}", self.app_label, self.model)
    }
}

/// The content-type catalog.
#[derive(Debug, Clone)]
pub struct ContentTypeCatalog {
    db: InMemoryDatabase,
}

impl ContentTypeCatalog {
    /// Creates a catalog over the given database.
    pub const fn new(db: InMemoryDatabase) -> Self {
        Self { db }
    }

    async fn rows(&self) -> ExtrasResult<Vec<ContentType>> {
        self.db
            .select(CONTENT_TYPE_MODEL)
            .await?
            .iter()
            .map(ContentType::from_record)
            .collect()
    }

    /// Returns `true` if the catalog can be queried.
    pub async fn is_ready(&self) -> bool {
        self.db.has_table(CONTENT_TYPE_MODEL).await
    }

    /// Returns every content type, in primary key order.
    pub async fn all(&self) -> ExtrasResult<Vec<ContentType>> {
        self.rows().await
    }

    /// Returns the content types of one application, in primary key order.
    pub async fn for_app(&self, app_label: &str) -> ExtrasResult<Vec<ContentType>> {
        Ok(self
            .rows()
            .await?
            .into_iter()
            .filter(|ct| ct.app_label == app_label)
            .collect())
    }

    /// Looks up a content type by natural key.
    pub async fn get_by_natural_key(&self, app_label: &str, model: &str) -> ExtrasResult<ContentType> {
        self.rows()
            .await?
            .into_iter()
            .find(|ct| ct.app_label == app_label && ct.model == model)
            .ok_or_else(|| {
                ExtrasError::DoesNotExist(format!(
                    "ContentType matching query does not exist: {app_label}.{model}"
                ))
            })
    }

    /// Looks up a content type by primary key.
    pub async fn get_for_id(&self, id: i64) -> ExtrasResult<ContentType> {
        self.rows()
            .await?
            .into_iter()
            .find(|ct| ct.id == id)
            .ok_or_else(|| {
                ExtrasError::DoesNotExist(format!("ContentType matching query does not exist: {id}"))
            })
    }

    /// Returns the content type of a model.
    pub async fn get_for_model(&self, meta: &ModelMeta) -> ExtrasResult<ContentType> {
        self.get_by_natural_key(&meta.app_label, &meta.model_name).await
    }

    /// Resolves the model class behind a content type.
    ///
    /// Returns `None` for stale content types whose model is no longer registered.
    pub fn model_class<'a>(&self, ct: &ContentType, models: &'a ModelRegistry) -> Option<&'a ModelClass> {
        models.get(&ct.app_label, &ct.model)
    }

    /// Creates a content type row for every registered model that lacks one.
    ///
    /// Runs after migration, mirroring the post-migrate hook of the
    /// contenttypes application. Returns the content types that were created.
    pub async fn create_content_types(&self, models: &ModelRegistry) -> ExtrasResult<Vec<ContentType>> {
        let existing = self.rows().await?;
        let mut created = Vec::new();
        for class in models.all() {
            let meta: &Arc<ModelMeta> = &class.meta;
            let known = existing
                .iter()
                .chain(created.iter())
                .any(|ct: &ContentType| ct.app_label == meta.app_label && ct.model == meta.model_name);
            if known {
                continue;
            }
            let mut row = Record::new();
            row.insert("app_label".into(), Value::String(meta.app_label.clone()));
            row.insert("model".into(), Value::String(meta.model_name.clone()));
            let stored = self.db.insert(CONTENT_TYPE_MODEL, row).await?;
            created.push(ContentType::from_record(&stored)?);
        }
        tracing::debug!(created = created.len(), "created content types");
        Ok(created)
    }
}
