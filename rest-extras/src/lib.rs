//! # rest-extras
//!
//! Auto-generated REST endpoints for every model a host application
//! registers.
//!
//! This is the meta-crate that re-exports all sub-crates. The usual entry
//! points are [`discover`] and [`register`]:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rest_extras::{discover, register, DefaultRouter, DiscoverOptions, HostContext};
//!
//! let ctx = Arc::new(HostContext::new(settings, db, models)?);
//! ctx.migrate().await?;
//! let mut router = DefaultRouter::new();
//! discover(&mut router, &ctx, &DiscoverOptions::default()).await?;
//! register(&mut router, &ctx, None)?;
//! axum::serve(listener, router.urls(ctx)).await?;
//! ```

/// Errors, settings, the app registry and logging.
pub use rest_extras_core as core;

/// Model metadata, the model registry, the in-memory store and content types.
pub use rest_extras_db as db;

/// Forms and model forms.
pub use rest_extras_forms as forms;

/// Users, password hashing, permissions and sessions.
pub use rest_extras_auth as auth;

/// Admin options and admin sites.
pub use rest_extras_admin as admin;

/// Discovery, generated endpoints and the user endpoint.
pub use rest_extras_rest as rest;

/// Test client and the reference test application.
#[cfg(feature = "testing")]
pub use rest_extras_test as test;

pub use rest_extras_core::{ExtrasError, ExtrasResult, Settings};
pub use rest_extras_rest::users::register;
pub use rest_extras_rest::{discover, DefaultRouter, DiscoverOptions, EntryOptions, HostContext, OverrideEntry};

pub use axum;
pub use serde_json;
pub use tokio;
pub use tracing;
