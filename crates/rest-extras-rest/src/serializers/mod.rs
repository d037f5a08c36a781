//! Serializers.
//!
//! A [`Serializer`] validates request data into attributes, saves them, and
//! renders rows as JSON. [`ModelSerializer`] is generated from a model's
//! fields; [`FormSerializer`] wraps it and delegates validation and saving to
//! a form when the model has one.

pub mod fields;
pub mod form;
pub mod model;

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde_json::Value;

use rest_extras_auth::CurrentUser;
use rest_extras_core::ExtrasResult;
use rest_extras_db::{ModelRegistry, Record};

use crate::relations::RouteTable;
use crate::request::{ApiRequest, RequestData};

pub use fields::{FieldKind, SerializerField};
pub use form::{FormDelegation, FormSerializer};
pub use model::{FieldSelection, ModelSerializer, SerializerOptions};

/// What a serializer knows about the request it serves.
#[derive(Debug, Clone)]
pub struct SerializerContext {
    /// Host used for absolute links.
    pub host: String,
    pub routes: Arc<RouteTable>,
    pub models: Arc<ModelRegistry>,
    pub user: CurrentUser,
    pub method: Method,
    /// Missing fields are left alone rather than required.
    pub partial: bool,
}

impl SerializerContext {
    pub fn from_request(request: &ApiRequest) -> Self {
        Self {
            host: request.host(),
            routes: Arc::clone(&request.routes),
            models: Arc::clone(request.ctx.models()),
            user: request.user.clone(),
            method: request.method.clone(),
            partial: request.is_partial(),
        }
    }
}

/// Validates, saves and renders rows of one model.
#[async_trait]
pub trait Serializer: Send + Sync {
    fn name(&self) -> &str;

    fn fields(&self) -> &[SerializerField];

    /// The row being updated, if any.
    fn instance(&self) -> Option<&Record>;

    /// Turns request data into validated attributes.
    async fn run_validation(&mut self, data: &RequestData) -> ExtrasResult<Record>;

    /// Object-level validation, run after every field is valid.
    async fn validate(&mut self, attrs: Record) -> ExtrasResult<Record> {
        Ok(attrs)
    }

    /// Creates or updates the row and returns it.
    async fn save(&mut self, validated: Record) -> ExtrasResult<Record>;

    fn to_representation(&self, instance: &Record) -> Value;
}

impl std::fmt::Debug for dyn Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
