use std::sync::Arc;

use async_trait::async_trait;

use rest_extras_auth::models::USER_MODEL;
use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::{Manager, ModelMeta, Record};

use super::permissions::UserPermissions;
use super::serializers::{Role, UserSerializer};
use crate::authentication::{Authentication, BasicAuthentication, SessionAuthentication};
use crate::context::HostContext;
use crate::permissions::Permission;
use crate::request::ApiRequest;
use crate::serializers::{Serializer, SerializerContext};
use crate::viewsets::ViewSet;

/// The `auth-user` endpoint. The serializer follows the caller's [`Role`].
pub struct UsersViewSet {
    meta: Arc<ModelMeta>,
    manager: Arc<dyn Manager>,
    authentication: Vec<Arc<dyn Authentication>>,
    permissions: Vec<Arc<dyn Permission>>,
}

impl std::fmt::Debug for UsersViewSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersViewSet").finish_non_exhaustive()
    }
}

impl UsersViewSet {
    pub fn new(ctx: &HostContext) -> ExtrasResult<Self> {
        let meta = ctx
            .models()
            .get_by_key(USER_MODEL)
            .map(|class| Arc::clone(&class.meta))
            .ok_or_else(|| ExtrasError::ImproperlyConfigured(format!("Model '{USER_MODEL}' is not registered")))?;
        Ok(Self {
            meta,
            manager: ctx.users()?,
            authentication: vec![Arc::new(SessionAuthentication), Arc::new(BasicAuthentication)],
            permissions: vec![Arc::new(UserPermissions)],
        })
    }
}

#[async_trait]
impl ViewSet for UsersViewSet {
    fn name(&self) -> &str {
        "UsersViewSet"
    }

    fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    fn manager(&self) -> &Arc<dyn Manager> {
        &self.manager
    }

    fn authentication_classes(&self) -> &[Arc<dyn Authentication>] {
        &self.authentication
    }

    fn permission_classes(&self) -> &[Arc<dyn Permission>] {
        &self.permissions
    }

    fn get_serializer(&self, request: &ApiRequest, instance: Option<Record>) -> ExtrasResult<Box<dyn Serializer>> {
        let role = Role::for_user(&request.user);
        let serializer = UserSerializer::new(
            role,
            Arc::clone(&self.meta),
            Arc::clone(&self.manager),
            SerializerContext::from_request(request),
            instance,
        )?;
        Ok(Box::new(serializer))
    }
}
