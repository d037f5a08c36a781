//! # rest-extras-test
//!
//! Testing tools for rest-extras. [`client::TestClient`] drives an axum app
//! in-process, and [`fixtures`] builds the reference test application: the
//! `tests` models, their forms and admin options, seeded users and rows, and
//! a router wired by discovery plus the user endpoint.

pub mod client;
pub mod fixtures;

pub use client::{TestClient, TestResponse, TEST_HOST};
pub use fixtures::{build_test_app, control, TestApp, PASSWORD};
