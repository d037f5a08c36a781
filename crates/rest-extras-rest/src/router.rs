//! The router.
//!
//! [`DefaultRouter`] keeps an ordered registry of `(prefix, viewset,
//! basename)` entries and turns it into an axum [`Router`] with
//! [`DefaultRouter::urls`]:
//!
//! | Path | Methods |
//! |---|---|
//! | `/` | `GET`: the API root, every prefix with its list URL |
//! | `/{prefix}/` | `GET` list, `POST` create |
//! | `/{prefix}/{pk}/` | `GET`, `PUT`, `PATCH`, `DELETE` |
//! | `/api-auth/login/`, `/api-auth/logout/` | session login and logout |

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Path;
use axum::routing::{any, get};
use axum::Router;
use http::{HeaderMap, Method, Uri};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use rest_extras_core::ExtrasError;
use rest_extras_db::Record;

use crate::api_auth;
use crate::context::HostContext;
use crate::relations::RouteTable;
use crate::request::{request_host, Action, ApiRequest, RequestData};
use crate::response::ApiResponse;
use crate::viewsets::{dispatch, ViewSet};

/// One registered viewset.
#[derive(Clone)]
pub struct RouterEntry {
    pub prefix: String,
    pub viewset: Arc<dyn ViewSet>,
    pub basename: String,
}

impl std::fmt::Debug for RouterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterEntry")
            .field("prefix", &self.prefix)
            .field("viewset", &self.viewset.name())
            .field("basename", &self.basename)
            .finish()
    }
}

/// An ordered registry of viewsets.
#[derive(Debug, Clone, Default)]
pub struct DefaultRouter {
    registry: Vec<RouterEntry>,
}

impl DefaultRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. The basename defaults to the prefix.
    pub fn register(&mut self, prefix: impl Into<String>, viewset: Arc<dyn ViewSet>, basename: Option<&str>) {
        let prefix = prefix.into();
        let basename = basename.map_or_else(|| prefix.clone(), ToString::to_string);
        self.registry.push(RouterEntry {
            prefix,
            viewset,
            basename,
        });
    }

    /// Removes every entry for `prefix`. Returns `true` if one existed.
    pub fn unregister(&mut self, prefix: &str) -> bool {
        let before = self.registry.len();
        self.registry.retain(|entry| entry.prefix != prefix);
        before != self.registry.len()
    }

    /// Registers `viewset` under `prefix`, replacing any earlier entry, so a
    /// prefix always has exactly one viewset.
    pub fn register_replacing(&mut self, prefix: &str, viewset: Arc<dyn ViewSet>) {
        if self.unregister(prefix) {
            tracing::debug!(prefix, viewset = viewset.name(), "replacing registered viewset");
        }
        self.register(prefix, viewset, None);
    }

    pub fn registry(&self) -> &[RouterEntry] {
        &self.registry
    }

    pub fn get(&self, prefix: &str) -> Option<&RouterEntry> {
        self.registry.iter().find(|entry| entry.prefix == prefix)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Which prefix serves which model.
    pub fn route_table(&self) -> RouteTable {
        let mut routes = RouteTable::new();
        for entry in &self.registry {
            routes.insert(entry.viewset.meta().model_key(), entry.prefix.clone());
        }
        routes
    }

    /// Builds the HTTP routes. When a prefix is registered twice the first
    /// entry is served.
    pub fn urls(&self, ctx: Arc<HostContext>) -> Router {
        let routes = Arc::new(self.route_table());
        let mut router = Router::new();
        let mut served = HashSet::new();
        let mut prefixes = Vec::new();

        for entry in &self.registry {
            if !served.insert(entry.prefix.clone()) {
                tracing::warn!(prefix = %entry.prefix, viewset = entry.viewset.name(), "prefix already routed, skipping");
                continue;
            }
            prefixes.push(entry.prefix.clone());

            let list = {
                let (viewset, ctx, routes) = (Arc::clone(&entry.viewset), Arc::clone(&ctx), Arc::clone(&routes));
                any(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                    let (viewset, ctx, routes) = (Arc::clone(&viewset), Arc::clone(&ctx), Arc::clone(&routes));
                    async move { serve(viewset, ctx, routes, method, uri, headers, body, None).await }
                })
            };
            let detail = {
                let (viewset, ctx, routes) = (Arc::clone(&entry.viewset), Arc::clone(&ctx), Arc::clone(&routes));
                any(
                    move |Path(pk): Path<String>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                        let (viewset, ctx, routes) = (Arc::clone(&viewset), Arc::clone(&ctx), Arc::clone(&routes));
                        async move { serve(viewset, ctx, routes, method, uri, headers, body, Some(pk)).await }
                    },
                )
            };
            router = router
                .route(&format!("/{}/", entry.prefix), list)
                .route(&format!("/{}/{{pk}}/", entry.prefix), detail);
        }

        tracing::info!(routes = prefixes.len(), "built API routes");
        let prefixes = Arc::new(prefixes);
        router
            .route(
                "/",
                get(move |headers: HeaderMap| {
                    let prefixes = Arc::clone(&prefixes);
                    async move { api_root(&prefixes, &request_host(&headers)) }
                }),
            )
            .merge(api_auth::routes(ctx))
            .layer(TraceLayer::new_for_http())
    }
}

fn api_root(prefixes: &[String], host: &str) -> ApiResponse {
    let links: Record = prefixes
        .iter()
        .map(|prefix| (prefix.clone(), Value::String(format!("http://{host}/{prefix}/"))))
        .collect();
    ApiResponse::ok(Value::Object(links))
}

#[allow(clippy::too_many_arguments)]
async fn serve(
    viewset: Arc<dyn ViewSet>,
    ctx: Arc<HostContext>,
    routes: Arc<RouteTable>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    pk: Option<String>,
) -> ApiResponse {
    let Some(action) = Action::from_method(&method, pk.is_some()) else {
        return ExtrasError::MethodNotAllowed(method.to_string()).into();
    };
    let data = match RequestData::parse(&headers, &body) {
        Ok(data) => data,
        Err(err) => return err.into(),
    };
    let request = ApiRequest::new(method, uri.path(), headers, action, data, ctx, routes);
    dispatch(viewset.as_ref(), request, pk).await
}
