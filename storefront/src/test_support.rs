//! Test utilities for the storefront crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled only for tests or with the `test-support` feature.

pub mod scripted_api;

pub use scripted_api::{ScriptedStorefrontApi, fixture_identity};
