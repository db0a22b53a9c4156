//! Reqwest-backed storefront API adapter.
//!
//! This adapter owns transport details only: URL resolution, bearer and
//! cookie credentials, timeout and HTTP status mapping, and JSON decoding.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use super::dto::{ErrorBodyDto, bearer_token, parse_grant};
use crate::domain::endpoints;
use crate::domain::ports::{ApiMethod, ApiRequest, StorefrontApi, StorefrontApiError};
use crate::domain::{Identity, LoginCredentials, Registration, SessionGrant, SessionToken};

/// Storefront API client over one base URL.
///
/// The client keeps a cookie jar, so a server-issued session cookie is sent
/// back on later calls alongside any bearer token. The jar is emptied when
/// the session store reports the session has ended.
pub struct HttpStorefrontApi {
    client: Client,
    base_url: Url,
    cookies: Arc<SessionCookies>,
}

/// Cookie jar that can be swapped for an empty one.
#[derive(Default)]
struct SessionCookies {
    jar: RwLock<Jar>,
}

impl SessionCookies {
    fn forget(&self) {
        *self.jar.write().unwrap_or_else(PoisonError::into_inner) = Jar::default();
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cookies(url)
    }
}

struct Reply {
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpStorefrontApi {
    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let cookies = Arc::new(SessionCookies::default());
        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;
        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    /// Base URL requests are resolved against.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, StorefrontApiError> {
        self.base_url.join(path).map_err(|error| {
            StorefrontApiError::transport(format!("cannot resolve {path}: {error}"))
        })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&SessionToken>,
    ) -> Result<RequestBuilder, StorefrontApiError> {
        let builder = self
            .client
            .request(method, self.url(path)?)
            .header(ACCEPT, "application/json");
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Reply, StorefrontApiError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(Reply {
            headers,
            body: body.to_vec(),
        })
    }

    async fn grant(&self, builder: RequestBuilder) -> Result<SessionGrant, StorefrontApiError> {
        let reply = self.execute(builder).await?;
        let header_token = reply
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);
        parse_grant(&reply.body, header_token).map_err(StorefrontApiError::decode)
    }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
    async fn current_user(
        &self,
        token: Option<SessionToken>,
    ) -> Result<Identity, StorefrontApiError> {
        let builder = self.request(Method::GET, endpoints::CURRENT_USER, token.as_ref())?;
        let reply = self.execute(builder).await?;
        serde_json::from_slice(&reply.body).map_err(|error| {
            StorefrontApiError::decode(format!("invalid identity payload: {error}"))
        })
    }

    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<SessionGrant, StorefrontApiError> {
        let builder = self
            .request(Method::POST, endpoints::LOGIN, None)?
            .json(credentials);
        self.grant(builder).await
    }

    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<SessionGrant, StorefrontApiError> {
        let builder = self
            .request(Method::POST, endpoints::REGISTER, None)?
            .json(registration);
        self.grant(builder).await
    }

    async fn logout(&self, token: Option<SessionToken>) -> Result<(), StorefrontApiError> {
        let builder = self.request(Method::POST, endpoints::LOGOUT, token.as_ref())?;
        self.execute(builder).await.map(drop)
    }

    async fn fetch(
        &self,
        path: &str,
        token: Option<SessionToken>,
    ) -> Result<Value, StorefrontApiError> {
        let builder = self.request(Method::GET, path, token.as_ref())?;
        let reply = self.execute(builder).await?;
        decode_json(&reply.body)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<SessionToken>,
    ) -> Result<Value, StorefrontApiError> {
        let builder = self.request(method_for(request.method), &request.path, token.as_ref())?;
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let reply = self.execute(builder).await?;
        decode_json(&reply.body)
    }

    fn forget_session(&self) {
        self.cookies.forget();
        debug!("session cookies discarded");
    }
}

const fn method_for(method: ApiMethod) -> Method {
    match method {
        ApiMethod::Post => Method::POST,
        ApiMethod::Patch => Method::PATCH,
        ApiMethod::Put => Method::PUT,
        ApiMethod::Delete => Method::DELETE,
    }
}

fn decode_json(body: &[u8]) -> Result<Value, StorefrontApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|error| StorefrontApiError::decode(format!("invalid JSON payload: {error}")))
}

fn map_transport_error(error: reqwest::Error) -> StorefrontApiError {
    if error.is_timeout() {
        StorefrontApiError::timeout(error.to_string())
    } else {
        StorefrontApiError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> StorefrontApiError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED => StorefrontApiError::unauthorized(message),
        StatusCode::FORBIDDEN => StorefrontApiError::forbidden(message),
        _ if status.is_client_error() => StorefrontApiError::validation(status.as_u16(), message),
        _ => StorefrontApiError::server(status.as_u16(), message),
    }
}

/// Server explanation carried by an error body.
///
/// Prefers a JSON `message` or `error` field, then the trimmed text. Bodies
/// that are not UTF-8 yield an empty message so callers fall back to
/// localised copy.
fn error_message(body: &[u8]) -> String {
    let Ok(text) = std::str::from_utf8(body) else {
        return String::new();
    };
    if let Ok(dto) = serde_json::from_str::<ErrorBodyDto>(text) {
        if let Some(message) = dto.into_message() {
            return message;
        }
    }
    body_preview(text)
}

fn body_preview(text: &str) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 300;

    let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
