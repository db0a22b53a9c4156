//! Route guard: whether a protected view may render for the current session.
//!
//! The guard is a pure function of the required capability and the session
//! snapshot. Performing the redirect or drawing the panel is the caller's
//! job.

use serde::Serialize;

use super::routes::{HOME_PATH, LOGIN_PATH, SELLER_REGISTRATION_PATH};
use super::{Capabilities, Session};

/// Capability level a view or action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequiredCapability {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in account.
    Authenticated,
    /// Seller or admin accounts.
    SellerOrAdmin,
    /// Admin accounts only.
    AdminOnly,
}

impl RequiredCapability {
    /// Whether `capabilities` satisfy this requirement.
    pub const fn is_met(self, capabilities: Capabilities) -> bool {
        match self {
            Self::Public => true,
            Self::Authenticated => capabilities.is_customer,
            Self::SellerOrAdmin => capabilities.is_seller,
            Self::AdminOnly => capabilities.is_admin,
        }
    }
}

/// Outcome of evaluating a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum GuardDecision {
    /// Render the protected view.
    Render,
    /// Render a neutral placeholder; neither redirect nor reveal content.
    Loading,
    /// Navigate elsewhere instead of rendering.
    Redirect {
        /// Path to navigate to.
        target: &'static str,
    },
    /// Render an in-place "access denied" panel, keeping the URL.
    Denied {
        /// Path the panel links back to.
        home: &'static str,
    },
}

/// Decide what a view guarded by `required` should do for `session`.
///
/// # Examples
/// ```
/// use storefront::domain::{GuardDecision, RequiredCapability, Session, guard};
///
/// let session = Session::default();
/// assert_eq!(
///     guard::decide(RequiredCapability::AdminOnly, &session),
///     GuardDecision::Loading,
/// );
/// ```
pub fn decide(required: RequiredCapability, session: &Session) -> GuardDecision {
    if required == RequiredCapability::Public {
        return GuardDecision::Render;
    }
    if session.is_pending() {
        return GuardDecision::Loading;
    }
    if required.is_met(session.capabilities()) {
        return GuardDecision::Render;
    }
    match required {
        RequiredCapability::Public => GuardDecision::Render,
        RequiredCapability::Authenticated => GuardDecision::Redirect { target: LOGIN_PATH },
        RequiredCapability::SellerOrAdmin => GuardDecision::Redirect {
            target: SELLER_REGISTRATION_PATH,
        },
        RequiredCapability::AdminOnly => GuardDecision::Denied { home: HOME_PATH },
    }
}
