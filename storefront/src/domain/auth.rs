//! Credential payloads and the session token issued on login.
//!
//! Inputs are validated here so the session store never sends a request the
//! API would reject for shape alone.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use zeroize::Zeroizing;

use super::{Identity, Role};

/// Domain error returned when credential payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// Email was missing or had no `@`.
    #[error("email must contain `@`")]
    InvalidEmail,
    /// Display name was blank.
    #[error("display name must not be empty")]
    EmptyDisplayName,
    /// Self-service registration cannot create admin accounts.
    #[error("admin accounts cannot be self-registered")]
    AdminRegistration,
}

/// Validated login credentials.
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use storefront::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("admin", "admin123").unwrap();
/// assert_eq!(creds.username(), "admin");
/// assert_eq!(creds.password(), "admin123");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    username: String,
    #[serde(serialize_with = "serialize_secret")]
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, CredentialValidationError> {
        Ok(Self {
            username: normalize_username(username)?,
            password: checked_password(password)?,
        })
    }

    /// Username string sent to the login endpoint.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated self-service registration payload.
///
/// Customers and sellers may register themselves; admin accounts are
/// provisioned out of band.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    username: String,
    #[serde(serialize_with = "serialize_secret")]
    password: Zeroizing<String>,
    role: Role,
    email: String,
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    referral_code: Option<String>,
}

impl Registration {
    /// Validate registration inputs.
    pub fn try_new(
        username: &str,
        password: &str,
        role: Role,
        email: &str,
        display_name: &str,
    ) -> Result<Self, CredentialValidationError> {
        if role == Role::Admin {
            return Err(CredentialValidationError::AdminRegistration);
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(CredentialValidationError::InvalidEmail);
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(CredentialValidationError::EmptyDisplayName);
        }
        Ok(Self {
            username: normalize_username(username)?,
            password: checked_password(password)?,
            role,
            email: email.to_owned(),
            display_name: display_name.to_owned(),
            referral_code: None,
        })
    }

    /// Attach the referral code a seller signed up with.
    #[must_use]
    pub fn with_referral_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.referral_code = (!code.trim().is_empty()).then(|| code.trim().to_owned());
        self
    }

    /// Requested username.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Requested role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Name shown in the consoles.
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Chosen password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Referral code, if any.
    pub fn referral_code(&self) -> Option<&str> {
        self.referral_code.as_deref()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("referral_code", &self.referral_code)
            .finish()
    }
}

/// Bearer token issued alongside a session cookie.
///
/// Held in memory only and zeroised on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    /// Wrap a token, rejecting blank values.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Zeroizing::new(trimmed.to_owned())))
        }
    }

    /// Token value for the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Successful login or registration: the identity plus an optional token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Identity the session now belongs to.
    pub identity: Identity,
    /// Token to present on later requests, when the API issues one.
    pub token: Option<SessionToken>,
}

impl SessionGrant {
    /// Grant without a bearer token (cookie-only session).
    pub const fn cookie_only(identity: Identity) -> Self {
        Self {
            identity,
            token: None,
        }
    }
}

fn normalize_username(username: &str) -> Result<String, CredentialValidationError> {
    let normalized = username.trim();
    if normalized.is_empty() {
        return Err(CredentialValidationError::EmptyUsername);
    }
    Ok(normalized.to_owned())
}

fn checked_password(password: &str) -> Result<Zeroizing<String>, CredentialValidationError> {
    if password.is_empty() {
        return Err(CredentialValidationError::EmptyPassword);
    }
    Ok(Zeroizing::new(password.to_owned()))
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Zeroizing<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.as_str())
}
