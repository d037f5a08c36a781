//! Viewsets.
//!
//! A [`ViewSet`] serves the list route (`GET`, `POST`) and the detail route
//! (`GET`, `PUT`, `PATCH`, `DELETE`) of one model. [`dispatch`] runs the
//! request lifecycle shared by every viewset:
//!
//! 1. authenticate with the viewset's authentication classes
//! 2. check `has_permission` for every permission class
//! 3. on detail routes, load the row and check `has_object_permission`
//! 4. run the action through the viewset's serializer
//!
//! [`ModelViewSet`] is the viewset generated for each discovered model.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;
use tracing::Instrument;

use rest_extras_core::logging::request_span;
use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::manager::parse_pk;
use rest_extras_db::{ContentType, Manager, ModelMeta, Record};

use crate::authentication::{authenticate, Authentication};
use crate::permissions::Permission;
use crate::request::{Action, ApiRequest};
use crate::response::{ApiResponse, NOT_AUTHENTICATED, NOT_FOUND, PERMISSION_DENIED};
use crate::serializers::{
    FormDelegation, FormSerializer, ModelSerializer, Serializer, SerializerContext, SerializerOptions,
};

/// The error for a denied request: 401-style when nobody authenticated,
/// 403 otherwise.
pub fn permission_denied(request: &ApiRequest) -> ExtrasError {
    if request.authenticated_by.is_none() {
        ExtrasError::NotAuthenticated(NOT_AUTHENTICATED.to_string())
    } else {
        ExtrasError::PermissionDenied(PERMISSION_DENIED.to_string())
    }
}

/// Runs every permission class's request-level check.
pub async fn check_permissions(
    classes: &[Arc<dyn Permission>],
    request: &ApiRequest,
    meta: &ModelMeta,
) -> ExtrasResult<()> {
    for class in classes {
        if !class.has_permission(request, meta).await? {
            tracing::debug!(permission = class.name(), "permission denied");
            return Err(permission_denied(request));
        }
    }
    Ok(())
}

/// Runs every permission class's row-level check.
pub async fn check_object_permissions(
    classes: &[Arc<dyn Permission>],
    request: &ApiRequest,
    meta: &ModelMeta,
    obj: &Record,
) -> ExtrasResult<()> {
    for class in classes {
        if !class.has_object_permission(request, meta, obj).await? {
            tracing::debug!(permission = class.name(), "object permission denied");
            return Err(permission_denied(request));
        }
    }
    Ok(())
}

/// The endpoints of one model.
#[async_trait]
pub trait ViewSet: Send + Sync {
    /// The viewset class name, e.g. `TestsVanillaViewSet`.
    fn name(&self) -> &str;

    fn meta(&self) -> &Arc<ModelMeta>;

    fn manager(&self) -> &Arc<dyn Manager>;

    fn authentication_classes(&self) -> &[Arc<dyn Authentication>];

    fn permission_classes(&self) -> &[Arc<dyn Permission>];

    /// Builds the serializer for this request, bound to `instance` on detail
    /// routes.
    fn get_serializer(&self, request: &ApiRequest, instance: Option<Record>) -> ExtrasResult<Box<dyn Serializer>>;

    /// The rows the list route returns.
    async fn get_queryset(&self, _request: &ApiRequest) -> ExtrasResult<Vec<Record>> {
        self.manager().all().await
    }

    /// Loads the row for a detail route and checks object permissions.
    async fn get_object(&self, request: &ApiRequest, pk: &str) -> ExtrasResult<Record> {
        let not_found = || ExtrasError::NotFound(NOT_FOUND.to_string());
        let pk = parse_pk(pk).ok_or_else(not_found)?;
        let obj = match self.manager().get(&pk).await {
            Ok(obj) => obj,
            Err(ExtrasError::DoesNotExist(_)) => return Err(not_found()),
            Err(err) => return Err(err),
        };
        check_object_permissions(self.permission_classes(), request, self.meta(), &obj).await?;
        Ok(obj)
    }
}

impl std::fmt::Debug for dyn ViewSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Handles one request and turns any error into its response.
pub async fn dispatch(view: &dyn ViewSet, mut request: ApiRequest, pk: Option<String>) -> ApiResponse {
    let span = request_span(view.name(), request.method.as_str(), &request.path);
    async move {
        match handle(view, &mut request, pk.as_deref()).await {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "handled");
                response
            }
            Err(err) => error_response(view, &request, err),
        }
    }
    .instrument(span)
    .await
}

async fn handle(view: &dyn ViewSet, request: &mut ApiRequest, pk: Option<&str>) -> ExtrasResult<ApiResponse> {
    let (user, authenticated_by) =
        authenticate(view.authentication_classes(), &request.headers, &request.ctx).await?;
    request.user = user;
    request.authenticated_by = authenticated_by;
    let request = &*request;

    check_permissions(view.permission_classes(), request, view.meta()).await?;

    let model = view.meta().model_key();
    match (request.action, pk) {
        (Action::List, _) => {
            let rows = view.get_queryset(request).await?;
            let serializer = view.get_serializer(request, None)?;
            Ok(ApiResponse::ok(Value::Array(
                rows.iter().map(|row| serializer.to_representation(row)).collect(),
            )))
        }
        (Action::Create, _) => {
            let mut serializer = view.get_serializer(request, None)?;
            let attrs = serializer.run_validation(&request.data).await?;
            let saved = serializer.save(attrs).await?;
            tracing::info!(model = %model, pk = ?saved.get(view.meta().pk_name()), "created");
            Ok(ApiResponse::created(serializer.to_representation(&saved)))
        }
        (Action::Retrieve, Some(pk)) => {
            let obj = view.get_object(request, pk).await?;
            let serializer = view.get_serializer(request, Some(obj.clone()))?;
            Ok(ApiResponse::ok(serializer.to_representation(&obj)))
        }
        (Action::Update | Action::PartialUpdate, Some(pk)) => {
            let obj = view.get_object(request, pk).await?;
            let mut serializer = view.get_serializer(request, Some(obj))?;
            let attrs = serializer.run_validation(&request.data).await?;
            let saved = serializer.save(attrs).await?;
            tracing::info!(model = %model, pk = %pk, action = %request.action, "updated");
            Ok(ApiResponse::ok(serializer.to_representation(&saved)))
        }
        (Action::Destroy, Some(pk)) => {
            let obj = view.get_object(request, pk).await?;
            let pk_value = obj.get(view.meta().pk_name()).cloned().unwrap_or(Value::Null);
            view.manager().delete(&pk_value).await?;
            tracing::info!(model = %model, pk = %pk, "deleted");
            Ok(ApiResponse::no_content())
        }
        (_, None) => Err(ExtrasError::MethodNotAllowed(request.method.to_string())),
    }
}

/// Renders an error. Authentication errors carry the first authentication
/// class's challenge, or become 403 when it has none.
fn error_response(view: &dyn ViewSet, request: &ApiRequest, err: ExtrasError) -> ApiResponse {
    let auth_error = matches!(
        err,
        ExtrasError::NotAuthenticated(_) | ExtrasError::AuthenticationFailed(_)
    );
    let mut response = ApiResponse::from(err);
    if auth_error {
        let challenge = view
            .authentication_classes()
            .first()
            .and_then(|class| class.authenticate_header(&request.ctx));
        match challenge {
            Some(challenge) => response = response.header(http::header::WWW_AUTHENTICATE, &challenge),
            None => response.set_status(StatusCode::FORBIDDEN),
        }
    }
    tracing::debug!(view = view.name(), status = %response.status(), "request refused");
    response
}

/// Everything a generated viewset knows about its model.
#[derive(Clone)]
pub struct Resource {
    /// The catalog entry the model was discovered from, if any.
    pub content_type: Option<ContentType>,
    pub meta: Arc<ModelMeta>,
    pub manager: Arc<dyn Manager>,
    pub delegation: FormDelegation,
    pub authentication_classes: Vec<Arc<dyn Authentication>>,
    pub permission_classes: Vec<Arc<dyn Permission>>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("model", &self.meta.model_key())
            .field("delegation", &self.delegation)
            .field("authentication_classes", &self.authentication_classes)
            .field("permission_classes", &self.permission_classes)
            .finish_non_exhaustive()
    }
}

/// `tests` to `Tests`.
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
        .unwrap_or_default()
}

/// The generated class name for a model, e.g. `TestsVanillaViewSet`.
pub fn viewset_name(meta: &ModelMeta) -> String {
    format!("{}{}ViewSet", capitalize(&meta.app_label), meta.object_name)
}

/// The generated serializer name for a model, e.g. `TestsVanillaSerializer`.
pub fn serializer_name(meta: &ModelMeta) -> String {
    format!("{}{}Serializer", capitalize(&meta.app_label), meta.object_name)
}

/// The viewset generated for a discovered model: full CRUD, hyperlinked,
/// with form delegation when the model has a form or admin options.
#[derive(Debug)]
pub struct ModelViewSet {
    name: String,
    resource: Resource,
}

impl ModelViewSet {
    pub fn new(resource: Resource) -> Self {
        Self {
            name: viewset_name(&resource.meta),
            resource,
        }
    }

    pub const fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[async_trait]
impl ViewSet for ModelViewSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn meta(&self) -> &Arc<ModelMeta> {
        &self.resource.meta
    }

    fn manager(&self) -> &Arc<dyn Manager> {
        &self.resource.manager
    }

    fn authentication_classes(&self) -> &[Arc<dyn Authentication>] {
        &self.resource.authentication_classes
    }

    fn permission_classes(&self) -> &[Arc<dyn Permission>] {
        &self.resource.permission_classes
    }

    fn get_serializer(&self, request: &ApiRequest, instance: Option<Record>) -> ExtrasResult<Box<dyn Serializer>> {
        let options = SerializerOptions::new(serializer_name(&self.resource.meta));
        let inner = ModelSerializer::new(
            Arc::clone(&self.resource.meta),
            Arc::clone(&self.resource.manager),
            &options,
            SerializerContext::from_request(request),
        )?
        .with_instance(instance);
        Ok(Box::new(FormSerializer::new(inner, self.resource.delegation.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names() {
        let meta = ModelMeta::new("tests", "WithAdminClass");
        assert_eq!(viewset_name(&meta), "TestsWithAdminClassViewSet");
        assert_eq!(serializer_name(&meta), "TestsWithAdminClassSerializer");
        assert_eq!(viewset_name(&ModelMeta::new("AUTH", "User")), "AuthUserViewSet");
        assert_eq!(capitalize(""), "");
    }
}
