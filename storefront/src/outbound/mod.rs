//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: reqwest-backed client for the storefront REST API.
//!
//! Adapters translate between wire formats and domain types and contain no
//! session logic.

pub mod http;
