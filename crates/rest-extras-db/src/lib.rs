//! # rest-extras-db
//!
//! Model layer for rest-extras. Models are described by [`ModelMeta`](model::ModelMeta)
//! rather than Rust types, because the REST layer is generic over every registered
//! model and works with JSON [`Record`](manager::Record)s.
//!
//! ## Module Overview
//!
//! - [`fields`] - Field definitions ([`FieldDef`](fields::FieldDef)) and types
//! - [`model`] - [`ModelMeta`](model::ModelMeta), including abstract bases
//! - [`manager`] - The [`Manager`](manager::Manager) capability and records
//! - [`registry`] - [`ModelRegistry`](registry::ModelRegistry) of model classes
//! - [`memory`] - [`InMemoryDatabase`](memory::InMemoryDatabase) and migrations
//! - [`contenttypes`] - The content-type catalog

// struct_excessive_bools: FieldDef mirrors Django's field API which uses many booleans
#![allow(clippy::struct_excessive_bools)]
// significant_drop_tightening: false positives with async RwLock guards
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::return_self_not_must_use)]

pub mod contenttypes;
pub mod fields;
pub mod manager;
pub mod memory;
pub mod model;
pub mod registry;

pub use contenttypes::{ContentType, ContentTypeCatalog};
pub use fields::{FieldDef, FieldDefault, FieldType};
pub use manager::{Manager, Record};
pub use memory::InMemoryDatabase;
pub use model::ModelMeta;
pub use registry::{ModelClass, ModelRegistry};
