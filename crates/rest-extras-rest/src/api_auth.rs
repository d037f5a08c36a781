//! Session login and logout for the browsable API.
//!
//! `POST /api-auth/login/` takes `username` and `password` (JSON or form
//! data) and sets the session cookie read by `SessionAuthentication`.
//! `/api-auth/logout/` ends the session and expires the cookie.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::Router;
use http::HeaderMap;
use serde_json::{json, Value};

use rest_extras_core::error::NON_FIELD_ERRORS;
use rest_extras_core::{ExtrasResult, ValidationError};

use crate::context::HostContext;
use crate::request::{parse_cookies, RequestData};
use crate::response::ApiResponse;
use crate::serializers::fields::REQUIRED;

pub const LOGIN_PATH: &str = "/api-auth/login/";
pub const LOGOUT_PATH: &str = "/api-auth/logout/";

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub fn routes(ctx: Arc<HostContext>) -> Router {
    Router::new()
        .route(LOGIN_PATH, post(login))
        .route(LOGOUT_PATH, post(logout).get(logout))
        .with_state(ctx)
}

fn credentials(data: &RequestData) -> Result<(String, String), ValidationError> {
    let field = |name: &str| data.get(name).and_then(Value::as_str).filter(|s| !s.is_empty());
    let mut errors = HashMap::new();
    for name in ["username", "password"] {
        if field(name).is_none() {
            errors.insert(name.to_string(), vec![REQUIRED.to_string()]);
        }
    }
    match (field("username"), field("password")) {
        (Some(username), Some(password)) => Ok((username.to_string(), password.to_string())),
        _ => Err(ValidationError::from_messages(&errors)),
    }
}

async fn try_login(ctx: &HostContext, headers: &HeaderMap, body: &[u8]) -> ExtrasResult<ApiResponse> {
    let data = RequestData::parse(headers, body)?;
    let (username, password) = credentials(&data)?;
    let Some(user) = ctx.backend().authenticate(&username, &password).await? else {
        tracing::info!(username = %username, "login failed");
        let mut errors = HashMap::new();
        errors.insert(NON_FIELD_ERRORS.to_string(), vec![INVALID_LOGIN.to_string()]);
        return Err(ValidationError::from_messages(&errors).into());
    };
    let key = ctx.sessions().login(&user).await;
    tracing::info!(username = %user.username, "logged in");
    let cookie = format!("{}={key}; HttpOnly; Path=/", ctx.settings().session_cookie_name);
    Ok(ApiResponse::ok(json!({"username": user.username})).header(http::header::SET_COOKIE, &cookie))
}

async fn login(State(ctx): State<Arc<HostContext>>, headers: HeaderMap, body: Bytes) -> ApiResponse {
    try_login(&ctx, &headers, &body)
        .await
        .unwrap_or_else(ApiResponse::from)
}

async fn logout(State(ctx): State<Arc<HostContext>>, headers: HeaderMap) -> ApiResponse {
    let name = &ctx.settings().session_cookie_name;
    if let Some(key) = parse_cookies(&headers).get(name) {
        ctx.sessions().logout(key).await;
        tracing::info!("logged out");
    }
    let expired = format!("{name}=; expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/");
    ApiResponse::ok(json!({"detail": "Logged out."})).header(http::header::SET_COOKIE, &expired)
}
