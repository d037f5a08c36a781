//! The manager capability.
//!
//! A [`Manager`] is the Rust counterpart of a Django model's `objects`
//! accessor: the standard collection-query interface. Models registered
//! without a manager are still known to the catalog but cannot be exposed
//! through the REST layer.

use async_trait::async_trait;
use serde_json::Value;

use rest_extras_core::{ExtrasError, ExtrasResult};

use crate::model::ModelMeta;

/// One stored row: field name to JSON value.
///
/// Foreign keys hold the target's primary key; many-to-many fields hold a
/// list of target primary keys.
pub type Record = serde_json::Map<String, Value>;

/// Parses a primary key taken from a URL segment.
///
/// Auto primary keys are integers; anything else is not a valid pk.
pub fn parse_pk(raw: &str) -> Option<Value> {
    raw.trim().parse::<i64>().ok().map(Value::from)
}

/// Normalizes a primary key value so `"1"` and `1` compare equal.
pub fn normalize_pk(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_i64().map(Value::from),
        Value::String(s) => parse_pk(s),
        _ => None,
    }
}

/// Returns the primary key of a record.
pub fn record_pk<'a>(meta: &ModelMeta, record: &'a Record) -> Option<&'a Value> {
    record.get(meta.pk_name())
}

/// Async collection-query interface for one model.
#[async_trait]
pub trait Manager: Send + Sync {
    /// Returns the metadata of the managed model.
    fn meta(&self) -> &ModelMeta;

    /// Returns every row, in primary key order.
    async fn all(&self) -> ExtrasResult<Vec<Record>>;

    /// Returns the rows whose `field` equals `value`.
    ///
    /// For many-to-many fields a row matches when its list contains `value`.
    async fn filter(&self, field: &str, value: &Value) -> ExtrasResult<Vec<Record>>;

    /// Inserts a row, filling defaults, and returns it with its primary key.
    async fn create(&self, values: Record) -> ExtrasResult<Record>;

    /// Updates the given fields of an existing row and returns the result.
    async fn update(&self, pk: &Value, values: Record) -> ExtrasResult<Record>;

    /// Deletes a row. Returns `false` if it did not exist.
    async fn delete(&self, pk: &Value) -> ExtrasResult<bool>;

    /// Fetches one row by primary key.
    async fn get(&self, pk: &Value) -> ExtrasResult<Record> {
        let pk = normalize_pk(pk).ok_or_else(|| self.does_not_exist())?;
        let pk_name = self.meta().pk_name().to_string();
        self.filter(&pk_name, &pk)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.does_not_exist())
    }

    /// Returns `true` if a row with this primary key exists.
    async fn exists(&self, pk: &Value) -> ExtrasResult<bool> {
        match self.get(pk).await {
            Ok(_) => Ok(true),
            Err(ExtrasError::DoesNotExist(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns the row with the highest primary key.
    async fn last(&self) -> ExtrasResult<Option<Record>> {
        Ok(self.all().await?.pop())
    }

    /// Returns the number of rows.
    async fn count(&self) -> ExtrasResult<usize> {
        Ok(self.all().await?.len())
    }

    /// The error raised when a lookup finds nothing.
    fn does_not_exist(&self) -> ExtrasError {
        ExtrasError::DoesNotExist(format!(
            "{} matching query does not exist.",
            self.meta().object_name
        ))
    }
}
