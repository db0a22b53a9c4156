//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod storefront_api;

#[cfg(test)]
pub use storefront_api::MockStorefrontApi;
pub use storefront_api::{ApiMethod, ApiRequest, StorefrontApi, StorefrontApiError};
