//! Authentication classes.
//!
//! An [`Authentication`] looks at the request headers and either identifies
//! a user, declines (`Ok(None)`, so the next class is tried), or fails with
//! `AuthenticationFailed`. Classes are configured by name in the
//! `authentication-classes` setting and resolved with [`authentication_class`].

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::HeaderMap;

use rest_extras_auth::{CurrentUser, User};
use rest_extras_core::{ExtrasError, ExtrasResult};

use crate::context::HostContext;
use crate::request::parse_cookies;

/// Identifies the user a request is made by.
#[async_trait]
pub trait Authentication: Send + Sync {
    /// The class name, as used in settings.
    fn name(&self) -> &'static str;

    /// Returns the user, `None` to let the next class try, or an error for
    /// bad credentials.
    async fn authenticate(&self, headers: &HeaderMap, ctx: &HostContext) -> ExtrasResult<Option<User>>;

    /// The `WWW-Authenticate` challenge, if this class issues one.
    ///
    /// When the first configured class has a challenge, unauthenticated
    /// requests get 401; otherwise they get 403.
    fn authenticate_header(&self, _ctx: &HostContext) -> Option<String> {
        None
    }
}

impl std::fmt::Debug for dyn Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Authenticates with the session cookie set by the login view.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAuthentication;

#[async_trait]
impl Authentication for SessionAuthentication {
    fn name(&self) -> &'static str {
        "SessionAuthentication"
    }

    async fn authenticate(&self, headers: &HeaderMap, ctx: &HostContext) -> ExtrasResult<Option<User>> {
        let cookies = parse_cookies(headers);
        let Some(key) = cookies.get(&ctx.settings().session_cookie_name) else {
            return Ok(None);
        };
        ctx.sessions().get_user(key, ctx.backend()).await
    }
}

/// HTTP Basic authentication against the user table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuthentication;

impl BasicAuthentication {
    fn failed(msg: &str) -> ExtrasError {
        ExtrasError::AuthenticationFailed(msg.to_string())
    }

    /// Splits an `Authorization` header value into username and password.
    fn credentials(header: &str) -> ExtrasResult<Option<(String, String)>> {
        let mut parts = header.split_whitespace();
        match parts.next() {
            Some(scheme) if scheme.eq_ignore_ascii_case("basic") => {}
            _ => return Ok(None),
        }
        let Some(encoded) = parts.next() else {
            return Err(Self::failed("Invalid basic header. No credentials provided."));
        };
        if parts.next().is_some() {
            return Err(Self::failed(
                "Invalid basic header. Credentials string should not contain spaces.",
            ));
        }
        let decoded = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| Self::failed("Invalid basic header. Credentials not correctly base64 encoded."))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| Self::failed("Invalid basic header. Credentials not correctly base64 encoded."))?;
        Ok(Some((username.to_string(), password.to_string())))
    }
}

#[async_trait]
impl Authentication for BasicAuthentication {
    fn name(&self) -> &'static str {
        "BasicAuthentication"
    }

    async fn authenticate(&self, headers: &HeaderMap, ctx: &HostContext) -> ExtrasResult<Option<User>> {
        let Some(header) = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(None);
        };
        let Some((username, password)) = Self::credentials(header)? else {
            return Ok(None);
        };
        match ctx.backend().authenticate(&username, &password).await? {
            Some(user) => Ok(Some(user)),
            None => Err(Self::failed("Invalid username/password.")),
        }
    }

    fn authenticate_header(&self, ctx: &HostContext) -> Option<String> {
        Some(format!(
            "Basic realm=\"{}\"",
            ctx.settings().www_authenticate_realm
        ))
    }
}

/// Resolves an authentication class by name. Dotted paths are accepted; only
/// the last component is used.
pub fn authentication_class(name: &str) -> ExtrasResult<Arc<dyn Authentication>> {
    match name.rsplit('.').next().unwrap_or(name) {
        "SessionAuthentication" => Ok(Arc::new(SessionAuthentication)),
        "BasicAuthentication" => Ok(Arc::new(BasicAuthentication)),
        other => Err(ExtrasError::ImproperlyConfigured(format!(
            "Unknown authentication class '{other}'"
        ))),
    }
}

/// Resolves every name in order.
pub fn authentication_classes<S: AsRef<str>>(names: &[S]) -> ExtrasResult<Vec<Arc<dyn Authentication>>> {
    names.iter().map(|n| authentication_class(n.as_ref())).collect()
}

/// Runs the classes in order. The first one that identifies a user wins.
pub async fn authenticate(
    classes: &[Arc<dyn Authentication>],
    headers: &HeaderMap,
    ctx: &HostContext,
) -> ExtrasResult<(CurrentUser, Option<&'static str>)> {
    for class in classes {
        if let Some(user) = class.authenticate(headers, ctx).await? {
            tracing::debug!(user = %user.username, by = class.name(), "authenticated");
            return Ok((CurrentUser::Authenticated(user), Some(class.name())));
        }
    }
    Ok((CurrentUser::Anonymous, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        let header = format!("Basic {}", STANDARD.encode("user:pass:word"));
        assert_eq!(
            BasicAuthentication::credentials(&header).unwrap(),
            Some(("user".to_string(), "pass:word".to_string()))
        );
        assert_eq!(BasicAuthentication::credentials("Bearer abc").unwrap(), None);
        assert!(BasicAuthentication::credentials("Basic").is_err());
        assert!(BasicAuthentication::credentials("Basic a b").is_err());
        assert!(BasicAuthentication::credentials("Basic !!!").is_err());
    }

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(authentication_class("SessionAuthentication").unwrap().name(), "SessionAuthentication");
        assert_eq!(
            authentication_class("rest_framework.authentication.BasicAuthentication")
                .unwrap()
                .name(),
            "BasicAuthentication"
        );
        assert!(matches!(
            authentication_class("TokenAuthentication"),
            Err(ExtrasError::ImproperlyConfigured(_))
        ));
        assert_eq!(authentication_classes(&["SessionAuthentication", "BasicAuthentication"]).unwrap().len(), 2);
    }
}
