//! Errors surfaced by the session store and console services.
//!
//! [`ErrorKind`] is the taxonomy views act on; [`SessionError`] is what
//! operations return.

use serde::Serialize;
use thiserror::Error;

use super::ports::StorefrontApiError;
use super::{CredentialValidationError, GatedAction, Locale};

/// How a view should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// No session: clear it and redirect to login. Not an error state.
    Unauthorized,
    /// Capability mismatch: blocking message, session kept.
    Forbidden,
    /// Rejected input: show the message inline next to the action.
    Validation,
    /// Anything else: generic toast, retry left to the user.
    Transport,
}

impl StorefrontApiError {
    /// Classify the failure.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } | Self::Transport { .. } | Self::Timeout { .. } | Self::Decode { .. } => {
                ErrorKind::Transport
            }
        }
    }
}

/// Failure of a session or console operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The API refused or could not serve the request.
    #[error(transparent)]
    Api(#[from] StorefrontApiError),
    /// The session lacks the capability for the action; nothing was sent.
    #[error("the current session may not {}", .action.as_str())]
    Forbidden {
        /// Refused action.
        action: GatedAction,
    },
    /// A newer credential operation started before this one completed; its
    /// result was discarded.
    #[error("superseded by a newer credential operation")]
    Superseded,
    /// Input failed validation before any request.
    #[error(transparent)]
    InvalidInput(#[from] CredentialValidationError),
    /// A console argument was rejected before any request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SessionError {
    /// Classify the failure for the initiating view.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(error) => error.kind(),
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidInput(_) | Self::InvalidArgument(_) => ErrorKind::Validation,
            Self::Superseded => ErrorKind::Transport,
        }
    }

    /// Message for the initiating view.
    ///
    /// Server text is passed through verbatim; gate refusals and expired
    /// sessions use localised copy.
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            Self::Api(error) => match (error.kind(), error.server_message()) {
                (_, Some(text)) => text.to_owned(),
                (ErrorKind::Unauthorized, None) => locale.session_expired().to_owned(),
                (ErrorKind::Forbidden, None) => locale.access_denied().to_owned(),
                (_, None) => locale.generic_failure().to_owned(),
            },
            Self::Forbidden { .. } => locale.access_denied().to_owned(),
            Self::InvalidInput(error) => error.to_string(),
            Self::InvalidArgument(reason) => reason.clone(),
            Self::Superseded => locale.generic_failure().to_owned(),
        }
    }
}
