//! # rest-extras-auth
//!
//! Authentication and authorization for rest-extras.
//!
//! ## Modules
//!
//! - [`models`] - The `auth`, `contenttypes` and `sessions` model definitions
//! - [`hashers`] - Argon2id password hashing
//! - [`user`] - The [`User`](user::User) view of a row and the request's [`CurrentUser`](user::CurrentUser)
//! - [`permissions`] - Default model permissions and their seeding
//! - [`backends`] - [`ModelBackend`](backends::ModelBackend): credentials and permission checks
//! - [`session`] - The in-memory [`SessionStore`](session::SessionStore)
//! - [`management`] - Migration: tables, content types and permissions

pub mod backends;
pub mod hashers;
pub mod management;
pub mod models;
pub mod permissions;
pub mod session;
pub mod user;

pub use backends::ModelBackend;
pub use hashers::{check_password, make_password};
pub use session::SessionStore;
pub use user::{CurrentUser, User};
