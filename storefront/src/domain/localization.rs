//! Localised fallback copy for failures the API did not explain.
//!
//! Server messages are shown verbatim. When a response carries no usable
//! text, views fall back to the generic copy below.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Locales with translated fallback copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    /// English (default).
    #[default]
    En,
    /// Spanish.
    Es,
    /// French.
    Fr,
}

impl Locale {
    /// Primary language subtag.
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
        }
    }

    /// Generic failure toast.
    pub const fn generic_failure(self) -> &'static str {
        match self {
            Self::En => "Something went wrong. Please try again.",
            Self::Es => "Algo salió mal. Inténtalo de nuevo.",
            Self::Fr => "Une erreur est survenue. Veuillez réessayer.",
        }
    }

    /// Shown when a session expires and the user is sent to log in again.
    pub const fn session_expired(self) -> &'static str {
        match self {
            Self::En => "Your session has expired. Please log in again.",
            Self::Es => "Tu sesión ha caducado. Inicia sesión de nuevo.",
            Self::Fr => "Votre session a expiré. Veuillez vous reconnecter.",
        }
    }

    /// Shown when the account lacks the capability for an action.
    pub const fn access_denied(self) -> &'static str {
        match self {
            Self::En => "You do not have permission to do that.",
            Self::Es => "No tienes permiso para hacer eso.",
            Self::Fr => "Vous n'avez pas l'autorisation de faire cela.",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raised when a locale tag has no translated copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale `{0}`")]
pub struct UnsupportedLocaleError(pub String);

impl FromStr for Locale {
    type Err = UnsupportedLocaleError;

    /// Parse a BCP 47 tag by its primary language (`en-GB` → `En`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let primary = value
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            "fr" => Ok(Self::Fr),
            _ => Err(UnsupportedLocaleError(value.to_owned())),
        }
    }
}
