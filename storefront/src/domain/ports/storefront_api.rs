//! Driven port for the storefront REST API.
//!
//! The session store and console services talk to the API only through this
//! trait, so tests substitute a double instead of a live server. Adapters
//! map transport failures into [`StorefrontApiError`] variants; the session
//! store decides what each variant means for the session.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Identity, Locale, LoginCredentials, Registration, SessionGrant, SessionToken};

use super::define_port_error;

define_port_error! {
    /// Errors raised by storefront API adapters.
    pub enum StorefrontApiError {
        /// 401: there is no valid session for the request.
        Unauthorized { message: String } =>
            "not authenticated: {message}",
        /// 403: the session lacks the role the endpoint requires.
        Forbidden { message: String } =>
            "forbidden: {message}",
        /// Other 4xx with a server explanation.
        Validation { status: u16, message: String } =>
            "request rejected ({status}): {message}",
        /// 5xx from the API.
        Server { status: u16, message: String } =>
            "storefront API failed ({status}): {message}",
        /// No response: connection, TLS, or DNS failure.
        Transport { message: String } =>
            "storefront API unreachable: {message}",
        /// No response within the configured timeout.
        Timeout { message: String } =>
            "storefront API timed out: {message}",
        /// A response arrived but could not be decoded.
        Decode { message: String } =>
            "unexpected storefront API response: {message}",
    }
}

impl StorefrontApiError {
    /// Text the server sent back, if the failure carried any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Validation { message, .. }
            | Self::Server { message, .. } => {
                Some(message.trim()).filter(|text| !text.is_empty())
            }
            Self::Transport { .. } | Self::Timeout { .. } | Self::Decode { .. } => None,
        }
    }

    /// Message to show the user: the server's text verbatim, or the
    /// localised generic copy when the server said nothing usable.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::Locale;
    /// use storefront::domain::ports::StorefrontApiError;
    ///
    /// let err = StorefrontApiError::validation(400_u16, "Username already exists");
    /// assert_eq!(err.user_message(Locale::En), "Username already exists");
    ///
    /// let err = StorefrontApiError::server(502_u16, "");
    /// assert_eq!(err.user_message(Locale::En), Locale::En.generic_failure());
    /// ```
    pub fn user_message(&self, locale: Locale) -> String {
        self.server_message()
            .map_or_else(|| locale.generic_failure().to_owned(), str::to_owned)
    }
}

/// HTTP method of a state-changing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    /// Create.
    Post,
    /// Partial update.
    Patch,
    /// Replace.
    Put,
    /// Remove.
    Delete,
}

/// State-changing request sent through [`StorefrontApi::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Method to use.
    pub method: ApiMethod,
    /// Path relative to the API base URL.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// `PATCH` without a body.
    pub fn patch(path: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Patch,
            path: path.into(),
            body: None,
        }
    }

    /// `POST` with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Port for the storefront REST API.
///
/// Token arguments are the bearer token captured when the request was
/// dispatched; adapters that rely on cookies alone may ignore them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// `GET /api/user`: who the current session belongs to.
    async fn current_user(&self, token: Option<SessionToken>)
    -> Result<Identity, StorefrontApiError>;

    /// `POST /api/login`.
    async fn login(&self, credentials: &LoginCredentials)
    -> Result<SessionGrant, StorefrontApiError>;

    /// `POST /api/register`.
    async fn register(&self, registration: &Registration)
    -> Result<SessionGrant, StorefrontApiError>;

    /// `POST /api/logout`.
    async fn logout(&self, token: Option<SessionToken>) -> Result<(), StorefrontApiError>;

    /// `GET` a JSON resource.
    async fn fetch(&self, path: &str, token: Option<SessionToken>)
    -> Result<Value, StorefrontApiError>;

    /// Send a state-changing request and decode the JSON reply (`null` for
    /// empty bodies).
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<SessionToken>,
    ) -> Result<Value, StorefrontApiError>;

    /// Drop any credential the adapter keeps on its own, such as a session
    /// cookie, once the session has ended locally.
    fn forget_session(&self);
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StorefrontApiError::unauthorized("Not authenticated"), Some("Not authenticated"))]
    #[case(StorefrontApiError::forbidden("Admins only"), Some("Admins only"))]
    #[case(StorefrontApiError::validation(422_u16, "  Price must be positive "), Some("Price must be positive"))]
    #[case(StorefrontApiError::server(500_u16, "   "), None)]
    #[case(StorefrontApiError::transport("connection refused"), None)]
    #[case(StorefrontApiError::decode("expected value at line 1"), None)]
    fn server_message_only_reports_server_text(
        #[case] error: StorefrontApiError,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(error.server_message(), expected);
    }

    #[rstest]
    #[case(Locale::En)]
    #[case(Locale::Es)]
    #[case(Locale::Fr)]
    fn transport_failures_use_localised_fallback(#[case] locale: Locale) {
        let err = StorefrontApiError::timeout("deadline elapsed");
        assert_eq!(err.user_message(locale), locale.generic_failure());
    }

    #[test]
    fn request_builders_set_method_and_body() {
        let request = ApiRequest::patch("/api/admin/products/4/approve");
        assert_eq!(request.method, ApiMethod::Patch);
        assert!(request.body.is_none());

        let request = ApiRequest::post("/api/orders", serde_json::json!({"items": []}));
        assert_eq!(request.method, ApiMethod::Post);
        assert!(request.body.is_some());
    }
}
