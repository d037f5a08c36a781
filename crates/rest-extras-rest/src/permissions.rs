//! Permission classes.
//!
//! Every request runs each configured [`Permission`]'s `has_permission`, and
//! detail requests also run `has_object_permission` against the row. A
//! `false` from any class denies the request.
//!
//! | Class | Rule |
//! |---|---|
//! | `AllowAny` | always allowed |
//! | `IsAuthenticated` | any authenticated user |
//! | `IsAdminUser` | staff users |
//! | `DjangoModelPermissions` | the `add`/`change`/`delete` model permission for the method |
//! | `DjangoObjectPermissions` | the same, checked against the row |
//! | `UserPermissions` | see [`crate::users::permissions`] |

use std::sync::Arc;

use async_trait::async_trait;

use rest_extras_auth::CurrentUser;
use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::{ModelMeta, Record};

use crate::request::ApiRequest;
use crate::response::NOT_FOUND;
use crate::users::permissions::UserPermissions;

/// Decides whether a request may proceed.
#[async_trait]
pub trait Permission: Send + Sync {
    /// The class name, as used in settings.
    fn name(&self) -> &'static str;

    /// Checked for every request, before any row is loaded.
    async fn has_permission(&self, _request: &ApiRequest, _model: &ModelMeta) -> ExtrasResult<bool> {
        Ok(true)
    }

    /// Checked for detail requests, once the row is loaded.
    async fn has_object_permission(
        &self,
        _request: &ApiRequest,
        _model: &ModelMeta,
        _obj: &Record,
    ) -> ExtrasResult<bool> {
        Ok(true)
    }
}

impl std::fmt::Debug for dyn Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

#[async_trait]
impl Permission for AllowAny {
    fn name(&self) -> &'static str {
        "AllowAny"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

#[async_trait]
impl Permission for IsAuthenticated {
    fn name(&self) -> &'static str {
        "IsAuthenticated"
    }

    async fn has_permission(&self, request: &ApiRequest, _model: &ModelMeta) -> ExtrasResult<bool> {
        Ok(request.user.is_authenticated())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsAdminUser;

#[async_trait]
impl Permission for IsAdminUser {
    fn name(&self) -> &'static str {
        "IsAdminUser"
    }

    async fn has_permission(&self, request: &ApiRequest, _model: &ModelMeta) -> ExtrasResult<bool> {
        Ok(request.user.is_staff())
    }
}

/// The model permissions a method requires, as `"app_label.codename"`.
pub fn required_permissions(method: &str, model: &ModelMeta) -> Vec<String> {
    let action = match method {
        "POST" => "add",
        "PUT" | "PATCH" => "change",
        "DELETE" => "delete",
        _ => return Vec::new(),
    };
    vec![format!("{}.{action}_{}", model.app_label, model.model_name)]
}

/// Checks permissions for the current user. Anonymous users hold none.
pub async fn user_has_perms(
    request: &ApiRequest,
    perms: &[String],
    obj: Option<&Record>,
) -> ExtrasResult<bool> {
    match &request.user {
        CurrentUser::Anonymous => Ok(perms.is_empty()),
        CurrentUser::Authenticated(user) => request.ctx.backend().has_perms(user, perms, obj).await,
    }
}

/// Requires an authenticated user holding the model permission for the
/// request method. Reads need no permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct DjangoModelPermissions;

#[async_trait]
impl Permission for DjangoModelPermissions {
    fn name(&self) -> &'static str {
        "DjangoModelPermissions"
    }

    async fn has_permission(&self, request: &ApiRequest, model: &ModelMeta) -> ExtrasResult<bool> {
        if !request.user.is_authenticated() {
            return Ok(false);
        }
        let perms = required_permissions(request.method.as_str(), model);
        user_has_perms(request, &perms, None).await
    }
}

/// Model permissions checked per row.
///
/// A user who may not even read the row gets 404 instead of 403, so the
/// row's existence is not disclosed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DjangoObjectPermissions;

#[async_trait]
impl Permission for DjangoObjectPermissions {
    fn name(&self) -> &'static str {
        "DjangoObjectPermissions"
    }

    async fn has_permission(&self, request: &ApiRequest, model: &ModelMeta) -> ExtrasResult<bool> {
        DjangoModelPermissions.has_permission(request, model).await
    }

    async fn has_object_permission(
        &self,
        request: &ApiRequest,
        model: &ModelMeta,
        obj: &Record,
    ) -> ExtrasResult<bool> {
        let perms = required_permissions(request.method.as_str(), model);
        if user_has_perms(request, &perms, Some(obj)).await? {
            return Ok(true);
        }
        if request.is_safe_method() {
            return Err(ExtrasError::NotFound(NOT_FOUND.to_string()));
        }
        let read_perms = required_permissions("GET", model);
        if !user_has_perms(request, &read_perms, Some(obj)).await? {
            return Err(ExtrasError::NotFound(NOT_FOUND.to_string()));
        }
        Ok(false)
    }
}

/// Resolves a permission class by name. Dotted paths are accepted; only the
/// last component is used.
pub fn permission_class(name: &str) -> ExtrasResult<Arc<dyn Permission>> {
    match name.rsplit('.').next().unwrap_or(name) {
        "AllowAny" => Ok(Arc::new(AllowAny)),
        "IsAuthenticated" => Ok(Arc::new(IsAuthenticated)),
        "IsAdminUser" => Ok(Arc::new(IsAdminUser)),
        "DjangoModelPermissions" => Ok(Arc::new(DjangoModelPermissions)),
        "DjangoObjectPermissions" => Ok(Arc::new(DjangoObjectPermissions)),
        "UserPermissions" => Ok(Arc::new(UserPermissions)),
        other => Err(ExtrasError::ImproperlyConfigured(format!(
            "Unknown permission class '{other}'"
        ))),
    }
}

/// Resolves every name in order.
pub fn permission_classes<S: AsRef<str>>(names: &[S]) -> ExtrasResult<Vec<Arc<dyn Permission>>> {
    names.iter().map(|n| permission_class(n.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_permissions() {
        let meta = ModelMeta::new("tests", "Vanilla");
        assert!(required_permissions("GET", &meta).is_empty());
        assert!(required_permissions("HEAD", &meta).is_empty());
        assert_eq!(required_permissions("POST", &meta), vec!["tests.add_vanilla"]);
        assert_eq!(required_permissions("PATCH", &meta), vec!["tests.change_vanilla"]);
        assert_eq!(required_permissions("PUT", &meta), vec!["tests.change_vanilla"]);
        assert_eq!(required_permissions("DELETE", &meta), vec!["tests.delete_vanilla"]);
    }

    #[test]
    fn test_resolve_by_name() {
        for name in [
            "AllowAny",
            "IsAuthenticated",
            "IsAdminUser",
            "DjangoModelPermissions",
            "DjangoObjectPermissions",
            "UserPermissions",
        ] {
            assert_eq!(permission_class(name).unwrap().name(), name);
        }
        assert_eq!(
            permission_class("rest_framework.permissions.IsAdminUser").unwrap().name(),
            "IsAdminUser"
        );
        assert!(matches!(
            permission_class("IsOwner"),
            Err(ExtrasError::ImproperlyConfigured(_))
        ));
        assert!(permission_classes(&["AllowAny", "Nope"]).is_err());
    }
}
