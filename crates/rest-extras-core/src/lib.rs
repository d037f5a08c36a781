//! # rest-extras-core
//!
//! Core types, settings, app registry, and error types for rest-extras.
//! This crate has no framework dependencies and provides the foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Host settings and the `rest_framework_extras` block
//! - [`settings_loader`] - Loading settings from TOML/JSON and the environment
//! - [`apps`] - Application registry
//! - [`logging`] - Tracing-based logging integration

pub mod apps;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{ExtrasError, ExtrasResult, ValidationError};
pub use settings::{ExtrasSettings, Settings};
