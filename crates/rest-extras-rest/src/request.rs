//! API requests.
//!
//! [`ApiRequest`] is one request as a viewset sees it: the resolved
//! [`Action`], the authenticated user, and the parsed body as
//! [`RequestData`]. Bodies may be JSON or `application/x-www-form-urlencoded`;
//! in the latter a repeated key becomes a list.

use std::collections::HashMap;
use std::sync::Arc;

use http::{HeaderMap, Method};
use serde_json::Value;

use rest_extras_auth::CurrentUser;
use rest_extras_core::{ExtrasError, ExtrasResult};
use rest_extras_db::Record;

use crate::context::HostContext;
use crate::relations::RouteTable;

/// Host used when a request carries no `Host` header.
pub const DEFAULT_HOST: &str = "localhost";

/// The viewset action a request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    /// Maps a method on a list (`detail == false`) or detail route to an action.
    pub fn from_method(method: &Method, detail: bool) -> Option<Self> {
        match (detail, method.as_str()) {
            (false, "GET" | "HEAD") => Some(Self::List),
            (false, "POST") => Some(Self::Create),
            (true, "GET" | "HEAD") => Some(Self::Retrieve),
            (true, "PUT") => Some(Self::Update),
            (true, "PATCH") => Some(Self::PartialUpdate),
            (true, "DELETE") => Some(Self::Destroy),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Retrieve => "retrieve",
            Self::Update => "update",
            Self::PartialUpdate => "partial_update",
            Self::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    /// Submitted values by field name.
    pub values: Record,
    /// `true` when the body was form-encoded, where every value is a string
    /// and unchecked checkboxes are simply absent.
    pub html_input: bool,
}

impl RequestData {
    /// Wraps JSON values.
    pub const fn json(values: Record) -> Self {
        Self {
            values,
            html_input: false,
        }
    }

    /// Parses a body according to its content type.
    ///
    /// An empty body is empty data. JSON bodies must be objects.
    pub fn parse(headers: &HeaderMap, body: &[u8]) -> ExtrasResult<Self> {
        let content_type = headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type.starts_with("application/x-www-form-urlencoded") {
            return Ok(Self {
                values: parse_form(&String::from_utf8_lossy(body)),
                html_input: true,
            });
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(values)) => Ok(Self::json(values)),
            Ok(_) => Err(ExtrasError::BadRequest(
                "JSON parse error - Expected an object.".to_string(),
            )),
            Err(e) => Err(ExtrasError::BadRequest(format!("JSON parse error - {e}"))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }
}

fn form_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Parses a form-encoded string. Repeated keys collect into a list.
pub fn parse_form(body: &str) -> Record {
    let mut values = Record::new();
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = form_decode(key);
        let value = Value::String(form_decode(value));
        match values.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                values.insert(key, value);
            }
        }
    }
    values
}

/// Parses the `Cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Returns the `Host` header, or [`DEFAULT_HOST`].
pub fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_HOST)
        .to_string()
}

/// One API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub action: Action,
    pub data: RequestData,
    /// Set by authentication.
    pub user: CurrentUser,
    /// The authentication class that identified the caller, if any.
    pub authenticated_by: Option<&'static str>,
    pub ctx: Arc<HostContext>,
    pub routes: Arc<RouteTable>,
}

impl ApiRequest {
    /// Creates an anonymous request.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        action: Action,
        data: RequestData,
        ctx: Arc<HostContext>,
        routes: Arc<RouteTable>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            action,
            data,
            user: CurrentUser::Anonymous,
            authenticated_by: None,
            ctx,
            routes,
        }
    }

    pub fn host(&self) -> String {
        request_host(&self.headers)
    }

    /// `true` for PATCH.
    pub fn is_partial(&self) -> bool {
        self.action == Action::PartialUpdate
    }

    /// `true` for methods that never modify state.
    pub fn is_safe_method(&self) -> bool {
        matches!(self.method.as_str(), "GET" | "HEAD" | "OPTIONS")
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        parse_cookies(&self.headers).remove(name)
    }
}
