//! # rest-extras-admin
//!
//! Admin classes for rest-extras. An [`AdminOptions`](model_admin::AdminOptions)
//! is the declarative admin class; instantiating it for a model and a site as
//! a [`ModelAdmin`](model_admin::ModelAdmin) yields the form class the admin
//! would use to add or change a row.
//!
//! - [`model_admin`] - Admin options and `ModelAdmin::get_form`
//! - [`site`] - [`AdminSite`](site::AdminSite) and the process-wide default site
//! - [`log_entry`] - The `admin.LogEntry` model

pub mod log_entry;
pub mod model_admin;
pub mod site;

pub use model_admin::{AdminOptions, ModelAdmin};
pub use site::AdminSite;
