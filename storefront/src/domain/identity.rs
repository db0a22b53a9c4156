//! Authenticated identity returned by the storefront API.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Role;

/// Validation errors returned when building an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Email was missing or had no `@`.
    #[error("email must contain `@`")]
    InvalidEmail,
    /// Display name was blank.
    #[error("display name must not be empty")]
    EmptyDisplayName,
}

/// Stable numeric account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated user's profile and role.
///
/// ## Invariants
/// - `username` is trimmed and non-empty.
/// - `email` contains `@`.
/// - `display_name` is non-empty once trimmed.
///
/// An identity is never edited in place: a new login or fetch replaces it.
///
/// # Examples
/// ```
/// use storefront::domain::{Identity, Role, UserId};
///
/// let identity = Identity::try_new(UserId::new(1), "admin", Role::Admin, "admin@shop.test", "Admin")
///     .expect("valid identity");
/// assert_eq!(identity.role(), Role::Admin);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityDto", into = "IdentityDto")]
pub struct Identity {
    id: UserId,
    username: String,
    role: Role,
    email: String,
    display_name: String,
    profile_image: Option<String>,
}

impl Identity {
    /// Validate and construct an identity.
    pub fn try_new(
        id: UserId,
        username: impl Into<String>,
        role: Role,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Self, IdentityValidationError> {
        let username = username.into().trim().to_owned();
        if username.is_empty() {
            return Err(IdentityValidationError::EmptyUsername);
        }
        let email = email.into();
        if !email.contains('@') {
            return Err(IdentityValidationError::InvalidEmail);
        }
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(IdentityValidationError::EmptyDisplayName);
        }
        Ok(Self {
            id,
            username,
            role,
            email,
            display_name,
            profile_image: None,
        })
    }

    /// Attach a profile image URL.
    #[must_use]
    pub fn with_profile_image(mut self, url: impl Into<String>) -> Self {
        self.profile_image = Some(url.into());
        self
    }

    /// Account identifier.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Login name.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Role the capability flags derive from.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Name shown in the console header.
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Optional avatar URL.
    pub fn profile_image(&self) -> Option<&str> {
        self.profile_image.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDto {
    id: UserId,
    username: String,
    role: Role,
    email: String,
    #[serde(alias = "display_name")]
    display_name: String,
    #[serde(default, alias = "profile_image", skip_serializing_if = "Option::is_none")]
    profile_image: Option<String>,
}

impl From<Identity> for IdentityDto {
    fn from(value: Identity) -> Self {
        Self {
            id: value.id,
            username: value.username,
            role: value.role,
            email: value.email,
            display_name: value.display_name,
            profile_image: value.profile_image,
        }
    }
}

impl TryFrom<IdentityDto> for Identity {
    type Error = IdentityValidationError;

    fn try_from(value: IdentityDto) -> Result<Self, Self::Error> {
        let IdentityDto {
            id,
            username,
            role,
            email,
            display_name,
            profile_image,
        } = value;
        let identity = Self::try_new(id, username, role, email, display_name)?;
        Ok(match profile_image {
            Some(url) => identity.with_profile_image(url),
            None => identity,
        })
    }
}
