//! HTTP test client.
//!
//! [`TestClient`] sends requests straight into an axum [`Router`] with
//! `tower::ServiceExt::oneshot`, keeps the cookies the app sets, and sends
//! `Host: testserver` so generated hyperlinks read `http://testserver/...`.
//!
//! ```rust,no_run
//! use rest_extras_test::client::TestClient;
//! use rest_extras_test::fixtures::build_test_app;
//!
//! async fn example() {
//!     let app = build_test_app().await.unwrap();
//!     let mut client = TestClient::new(app.router.clone());
//!     assert!(client.login("superuser", "password").await);
//!     let response = client.get("/tests-vanilla/").await;
//!     assert_eq!(response.status_code(), 200);
//! }
//! ```

use std::collections::HashMap;

use axum::body::{Body, Bytes};
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use rest_extras_core::ExtrasError;
use rest_extras_rest::api_auth::{LOGIN_PATH, LOGOUT_PATH};

/// The host every request claims to be for.
pub const TEST_HOST: &str = "testserver";

/// A cookie-keeping client over an axum app.
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete(&mut self, path: &str) -> TestResponse {
        self.send(Method::DELETE, path, None).await
    }

    /// Sends a POST with a JSON body.
    pub async fn post_json(&mut self, path: &str, data: &Value) -> TestResponse {
        self.send_json(Method::POST, path, data).await
    }

    /// Sends a PUT with a JSON body.
    pub async fn put_json(&mut self, path: &str, data: &Value) -> TestResponse {
        self.send_json(Method::PUT, path, data).await
    }

    /// Sends a PATCH with a JSON body.
    pub async fn patch_json(&mut self, path: &str, data: &Value) -> TestResponse {
        self.send_json(Method::PATCH, path, data).await
    }

    /// Sends a form-encoded POST. Repeat a key to submit a list.
    pub async fn post_form(&mut self, path: &str, data: &[(&str, &str)]) -> TestResponse {
        self.send_form(Method::POST, path, data).await
    }

    /// Sends a form-encoded PATCH.
    pub async fn patch_form(&mut self, path: &str, data: &[(&str, &str)]) -> TestResponse {
        self.send_form(Method::PATCH, path, data).await
    }

    /// Logs in through the session endpoint. Returns `true` on success.
    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        let data = serde_json::json!({"username": username, "password": password});
        self.post_json(LOGIN_PATH, &data).await.status == StatusCode::OK
    }

    /// Logs out and forgets every cookie.
    pub async fn logout(&mut self) {
        self.send(Method::POST, LOGOUT_PATH, None).await;
        self.cookies.clear();
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    async fn send_json(&mut self, method: Method, path: &str, data: &Value) -> TestResponse {
        let body = serde_json::to_vec(data).unwrap_or_default();
        self.send(method, path, Some(("application/json", body))).await
    }

    async fn send_form(&mut self, method: Method, path: &str, data: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(data)
            .finish();
        self.send(method, path, Some(("application/x-www-form-urlencoded", body.into_bytes())))
            .await
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    async fn send(&mut self, method: Method, path: &str, body: Option<(&str, Vec<u8>)>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::HOST, TEST_HOST);
        if let Some(cookie) = self.cookie_header() {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        let body = match body {
            Some((content_type, bytes)) => {
                builder = builder.header(http::header::CONTENT_TYPE, content_type);
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request builder should not fail");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();
        for value in headers.get_all(http::header::SET_COOKIE) {
            let Some(pair) = value.to_str().ok().and_then(|c| c.split(';').next()) else {
                continue;
            };
            if let Some((name, val)) = pair.split_once('=') {
                let (name, val) = (name.trim(), val.trim());
                if val.is_empty() {
                    self.cookies.remove(name);
                } else {
                    self.cookies.insert(name.to_string(), val.to_string());
                }
            }
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Bytes::new(), http_body_util::Collected::to_bytes);

        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Value, ExtrasError> {
        serde_json::from_slice(&self.body).map_err(|e| ExtrasError::SerializationError(e.to_string()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
