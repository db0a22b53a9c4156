//! Storefront REST API adapter.
//!
//! This module provides the reqwest implementation of the `StorefrontApi`
//! port.

mod client;
mod dto;

pub use client::HttpStorefrontApi;
