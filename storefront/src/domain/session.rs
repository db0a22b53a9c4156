//! Session snapshot observed by route guards and action gates.

use super::ports::StorefrontApiError;
use super::{Capabilities, Identity};

/// Resolution state of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nobody has asked the API who is logged in yet, or the last attempt
    /// failed for a reason other than 401.
    #[default]
    Unresolved,
    /// An identity request is in flight.
    Resolving,
    /// The API confirmed an identity.
    Authenticated(Identity),
    /// The API confirmed there is no session.
    Anonymous,
}

impl SessionState {
    /// Identity of an authenticated session.
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Short label used in logs and CLI output.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Resolving => "resolving",
            Self::Authenticated(_) => "authenticated",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Immutable snapshot of the session at one commit.
///
/// Snapshots are replaced wholesale; observers either see the previous
/// snapshot or the next one, never a mix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    state: SessionState,
    error: Option<StorefrontApiError>,
    generation: u64,
}

impl Session {
    /// Current resolution state.
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Identity, when authenticated.
    pub const fn identity(&self) -> Option<&Identity> {
        self.state.identity()
    }

    /// Failure recorded by the last identity fetch, if it did not resolve.
    pub const fn error(&self) -> Option<&StorefrontApiError> {
        self.error.as_ref()
    }

    /// Number of credential operations and expiries started so far.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Capability flags for this snapshot.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::resolve(&self.state)
    }

    /// Whether protected content must wait for resolution.
    ///
    /// True while a fetch is in flight and before the first fetch has run.
    /// A failed fetch is not pending: consumers fall back to the
    /// capability-absent rules.
    pub const fn is_pending(&self) -> bool {
        match self.state {
            SessionState::Resolving => true,
            SessionState::Unresolved => self.error.is_none(),
            _ => false,
        }
    }

    /// Whether the API confirmed an identity.
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub(crate) fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn mark_resolving(&mut self) {
        self.state = SessionState::Resolving;
    }

    pub(crate) fn authenticate(&mut self, identity: Identity) {
        self.state = SessionState::Authenticated(identity);
        self.error = None;
    }

    pub(crate) fn clear(&mut self) {
        self.state = SessionState::Anonymous;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: StorefrontApiError) {
        self.state = SessionState::Unresolved;
        self.error = Some(error);
    }
}
