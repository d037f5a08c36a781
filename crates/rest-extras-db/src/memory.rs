//! In-memory model storage.
//!
//! [`InMemoryDatabase`] stores rows as JSON [`Record`]s, one table per model
//! key. Tables only exist after [`InMemoryDatabase::migrate`] has run; any
//! query against a missing table fails with `OperationalError`, which is how
//! the content-type catalog reports that the host storage is not ready.
//!
//! Tables sit behind one `Arc<RwLock<...>>`, so clones share storage.
//!
//! # Example
//!
//! ```
//! use rest_extras_db::memory::InMemoryDatabase;
//! use rest_extras_db::model::ModelMeta;
//! use rest_extras_db::registry::ModelRegistry;
//!
//! # async fn demo() -> rest_extras_core::ExtrasResult<()> {
//! let db = InMemoryDatabase::new();
//! let mut models = ModelRegistry::new();
//! models.register(db.model_class(ModelMeta::new("tests", "Bar")))?;
//! db.migrate(&models).await?;
//!
//! let bars = models.get("tests", "bar").and_then(|m| m.objects()).cloned();
//! let bar = bars.unwrap().create(Default::default()).await?;
//! assert_eq!(bar["id"], 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use rest_extras_core::{ExtrasError, ExtrasResult};

use crate::fields::{FieldDef, FieldType};
use crate::manager::{normalize_pk, Manager, Record};
use crate::model::ModelMeta;
use crate::registry::{ModelClass, ModelRegistry};

/// Storage for one model.
#[derive(Debug, Clone)]
struct Table {
    meta: Arc<ModelMeta>,
    rows: Vec<Record>,
    next_id: i64,
}

impl Table {
    const fn new(meta: Arc<ModelMeta>) -> Self {
        Self {
            meta,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn position(&self, pk: &Value) -> Option<usize> {
        let pk_name = self.meta.pk_name();
        self.rows
            .iter()
            .position(|row| row.get(pk_name).and_then(normalize_pk).as_ref() == Some(pk))
    }

    fn check_constraints(&self, row: &Record, skip: Option<usize>) -> ExtrasResult<()> {
        let table = self.meta.db_table();
        for field in &self.meta.fields {
            let value = row.get(&field.name).unwrap_or(&Value::Null);
            if value.is_null() && !field.null {
                return Err(ExtrasError::IntegrityError(format!(
                    "NOT NULL constraint failed: {table}.{}",
                    field.name
                )));
            }
            if field.unique && !value.is_null() {
                let clash = self.rows.iter().enumerate().any(|(idx, other)| {
                    Some(idx) != skip && other.get(&field.name) == Some(value)
                });
                if clash {
                    return Err(ExtrasError::IntegrityError(format!(
                        "UNIQUE constraint failed: {table}.{}",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Coerces a value into the stored shape for its field.
fn coerce(field: &FieldDef, value: Value) -> Value {
    match (&field.field_type, value) {
        (FieldType::ForeignKey { .. } | FieldType::AutoField, v) => {
            normalize_pk(&v).unwrap_or(v)
        }
        (FieldType::ManyToManyField { .. }, Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_pk(&item).unwrap_or(item))
                .collect(),
        ),
        (_, v) => v,
    }
}

/// An in-memory database of model tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    /// Tables keyed by model key (e.g., "tests.vanilla").
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl InMemoryDatabase {
    /// Creates a new database with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps metadata in a managed [`ModelClass`] backed by this database.
    pub fn model_class(&self, meta: ModelMeta) -> ModelClass {
        let meta = Arc::new(meta);
        ModelClass::managed(meta.clone(), self.manager(meta))
    }

    /// Returns a manager for the given model.
    pub fn manager(&self, meta: Arc<ModelMeta>) -> Arc<dyn Manager> {
        Arc::new(TableManager {
            db: self.clone(),
            meta,
        })
    }

    /// Creates the table for a model if it does not exist yet.
    pub async fn create_table(&self, meta: Arc<ModelMeta>) {
        let mut tables = self.tables.write().await;
        tables
            .entry(meta.model_key())
            .or_insert_with(|| Table::new(meta));
    }

    /// Creates tables for every registered model.
    pub async fn migrate(&self, models: &ModelRegistry) -> ExtrasResult<()> {
        for class in models.all() {
            self.create_table(class.meta.clone()).await;
        }
        tracing::debug!(tables = models.len(), "migrated in-memory database");
        Ok(())
    }

    /// Returns `true` if the model's table exists.
    pub async fn has_table(&self, model_key: &str) -> bool {
        self.tables.read().await.contains_key(model_key)
    }

    /// Drops every table, returning the database to its unmigrated state.
    pub async fn flush(&self) {
        self.tables.write().await.clear();
    }

    fn no_such_table(model_key: &str) -> ExtrasError {
        ExtrasError::OperationalError(format!(
            "no such table: {}",
            model_key.replace('.', "_")
        ))
    }

    /// Returns every row of a table, in primary key order.
    pub async fn select(&self, model_key: &str) -> ExtrasResult<Vec<Record>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(model_key)
            .ok_or_else(|| Self::no_such_table(model_key))?;
        Ok(table.rows.clone())
    }

    /// Inserts a row, filling defaults and assigning the auto primary key.
    pub async fn insert(&self, model_key: &str, values: Record) -> ExtrasResult<Record> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(model_key)
            .ok_or_else(|| Self::no_such_table(model_key))?;

        let mut row = Record::new();
        for field in &table.meta.fields {
            let value = match values.get(&field.name) {
                Some(v) => coerce(field, v.clone()),
                None if field.field_type == FieldType::AutoField => Value::from(table.next_id),
                None => field.get_default(),
            };
            row.insert(field.name.clone(), value);
        }

        table.check_constraints(&row, None)?;
        if let Some(id) = row.get(table.meta.pk_name()).and_then(Value::as_i64) {
            table.next_id = table.next_id.max(id + 1);
        }
        table.rows.push(row.clone());
        Ok(row)
    }

    /// Updates the given fields of a row.
    pub async fn update_row(
        &self,
        model_key: &str,
        pk: &Value,
        values: Record,
    ) -> ExtrasResult<Option<Record>> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(model_key)
            .ok_or_else(|| Self::no_such_table(model_key))?;
        let Some(pos) = normalize_pk(pk).and_then(|pk| table.position(&pk)) else {
            return Ok(None);
        };

        let mut row = table.rows[pos].clone();
        let pk_name = table.meta.pk_name().to_string();
        for (name, value) in values {
            if name == pk_name {
                continue;
            }
            if let Some(field) = table.meta.get_field(&name) {
                row.insert(name, coerce(field, value));
            }
        }
        table.check_constraints(&row, Some(pos))?;
        table.rows[pos] = row.clone();
        Ok(Some(row))
    }

    /// Deletes a row. Returns `false` if it did not exist.
    pub async fn delete_row(&self, model_key: &str, pk: &Value) -> ExtrasResult<bool> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(model_key)
            .ok_or_else(|| Self::no_such_table(model_key))?;
        match normalize_pk(pk).and_then(|pk| table.position(&pk)) {
            Some(pos) => {
                table.rows.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A [`Manager`] over one table of an [`InMemoryDatabase`].
struct TableManager {
    db: InMemoryDatabase,
    meta: Arc<ModelMeta>,
}

fn row_matches(field: Option<&FieldDef>, stored: Option<&Value>, wanted: &Value) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    match field.map(|f| &f.field_type) {
        Some(FieldType::ManyToManyField { .. }) => {
            let wanted = normalize_pk(wanted);
            stored
                .as_array()
                .is_some_and(|items| items.iter().any(|i| normalize_pk(i) == wanted))
        }
        Some(FieldType::AutoField | FieldType::ForeignKey { .. }) => {
            normalize_pk(stored).is_some() && normalize_pk(stored) == normalize_pk(wanted)
        }
        _ => stored == wanted,
    }
}

#[async_trait]
impl Manager for TableManager {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    async fn all(&self) -> ExtrasResult<Vec<Record>> {
        self.db.select(&self.meta.model_key()).await
    }

    async fn filter(&self, field: &str, value: &Value) -> ExtrasResult<Vec<Record>> {
        let def = self.meta.get_field(field);
        let rows = self.all().await?;
        Ok(rows
            .into_iter()
            .filter(|row| row_matches(def, row.get(field), value))
            .collect())
    }

    async fn create(&self, values: Record) -> ExtrasResult<Record> {
        self.db.insert(&self.meta.model_key(), values).await
    }

    async fn update(&self, pk: &Value, values: Record) -> ExtrasResult<Record> {
        self.db
            .update_row(&self.meta.model_key(), pk, values)
            .await?
            .ok_or_else(|| self.does_not_exist())
    }

    async fn delete(&self, pk: &Value) -> ExtrasResult<bool> {
        self.db.delete_row(&self.meta.model_key(), pk).await
    }
}
