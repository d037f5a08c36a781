//! Permissions for the user endpoint.

use async_trait::async_trait;

use rest_extras_core::ExtrasResult;
use rest_extras_db::manager::{normalize_pk, record_pk};
use rest_extras_db::{ModelMeta, Record};

use crate::permissions::{DjangoObjectPermissions, Permission};
use crate::request::{Action, ApiRequest};

/// Who may see and change which user rows.
///
/// Detail actions are let through at the request level and decided per row:
/// superusers may act on anyone, everybody may act on themselves, and staff
/// may act on others when the model permissions allow it. Listing and
/// creating need staff.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPermissions;

#[async_trait]
impl Permission for UserPermissions {
    fn name(&self) -> &'static str {
        "UserPermissions"
    }

    async fn has_permission(&self, request: &ApiRequest, _model: &ModelMeta) -> ExtrasResult<bool> {
        let detail_action = matches!(
            request.action,
            Action::Retrieve | Action::Update | Action::PartialUpdate
        );
        Ok(detail_action || request.user.is_staff())
    }

    async fn has_object_permission(&self, request: &ApiRequest, model: &ModelMeta, obj: &Record) -> ExtrasResult<bool> {
        let user = &request.user;
        if user.is_superuser() {
            return Ok(true);
        }
        let own_pk = user.pk().as_ref().and_then(normalize_pk);
        let obj_pk = record_pk(model, obj).and_then(normalize_pk);
        if own_pk.is_some() && own_pk == obj_pk {
            return Ok(true);
        }
        if !user.is_staff() {
            return Ok(false);
        }
        DjangoObjectPermissions.has_object_permission(request, model, obj).await
    }
}
