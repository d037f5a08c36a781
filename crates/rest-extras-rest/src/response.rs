//! API responses.
//!
//! [`ApiResponse`] is a status, optional JSON body and extra headers. Errors
//! convert into responses with the same bodies the REST framework uses:
//! validation errors render their field map, everything else renders as
//! `{"detail": "..."}`.

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Value};

use rest_extras_core::ExtrasError;

/// Detail for a missing authentication.
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
/// Detail for a failed permission check.
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
/// Detail for an unknown object.
pub const NOT_FOUND: &str = "Not found.";

/// An API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Option<Value>,
    headers: HeaderMap,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Self {
            status,
            body,
            headers: HeaderMap::new(),
        }
    }

    /// 200 with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, Some(body))
    }

    /// 201 with a JSON body.
    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, Some(body))
    }

    /// 204 without a body.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, None)
    }

    /// A `{"detail": ...}` body with the given status.
    pub fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::new(status, Some(json!({ "detail": detail.into() })))
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Adds a header. Invalid values are dropped with a warning.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.append(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "dropping invalid header value"),
        }
        self
    }
}

impl From<ExtrasError> for ApiResponse {
    fn from(err: ExtrasError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            ExtrasError::ValidationError(error) => Self::new(status, Some(error.to_json())),
            ExtrasError::BadRequest(detail)
            | ExtrasError::NotAuthenticated(detail)
            | ExtrasError::AuthenticationFailed(detail)
            | ExtrasError::PermissionDenied(detail) => Self::detail(status, detail),
            ExtrasError::NotFound(_) | ExtrasError::DoesNotExist(_) => Self::detail(status, NOT_FOUND),
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "request failed");
                }
                Self::detail(status, other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response = match self.body {
            Some(body) => (self.status, axum::Json(body)).into_response(),
            None => self.status.into_response(),
        };
        for (name, value) in &self.headers {
            response.headers_mut().append(name, value.clone());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rest_extras_core::ValidationError;

    use super::*;

    #[test]
    fn test_validation_error_body() {
        let mut errors = HashMap::new();
        errors.insert("an_integer".to_string(), vec!["This field is required.".to_string()]);
        let response = ApiResponse::from(ExtrasError::ValidationError(ValidationError::from_messages(&errors)));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), Some(&json!({"an_integer": ["This field is required."]})));
    }

    #[test]
    fn test_detail_bodies() {
        let response = ApiResponse::from(ExtrasError::PermissionDenied(PERMISSION_DENIED.into()));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.body(), Some(&json!({"detail": PERMISSION_DENIED})));

        let response = ApiResponse::from(ExtrasError::DoesNotExist("Vanilla matching query does not exist.".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), Some(&json!({"detail": "Not found."})));

        let response = ApiResponse::from(ExtrasError::MethodNotAllowed("PUT".into()));
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body(), Some(&json!({"detail": "Method \"PUT\" not allowed."})));
    }

    #[test]
    fn test_partial_update_keeps_source_status() {
        let err = ExtrasError::IntegrityError("NOT NULL constraint failed: tests_withform.foreign_field".into())
            .during_partial_update();
        let response = ApiResponse::from(err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.body().unwrap()["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("partial update (PATCH)"));
    }

    #[test]
    fn test_into_response_keeps_headers() {
        let response = ApiResponse::no_content()
            .header(http::header::SET_COOKIE, "sessionid=abc; Path=/")
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[http::header::SET_COOKIE], "sessionid=abc; Path=/");
    }
}
