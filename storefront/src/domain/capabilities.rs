//! Capability flags derived from the session.
//!
//! This is the single place role strings turn into permissions. Callers never
//! compare roles themselves; they read a [`Capabilities`] value computed from
//! the current session snapshot.

use serde::Serialize;

use super::{Role, SessionState};

/// Boolean permissions for the current session.
///
/// ## Invariants
/// - `is_admin` implies `is_seller`, which implies `is_customer`.
/// - The value is a pure function of the session state and is recomputed on
///   every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Admin console access.
    pub is_admin: bool,
    /// Seller console access.
    pub is_seller: bool,
    /// Any authenticated account.
    pub is_customer: bool,
}

impl Capabilities {
    /// Capabilities of a signed-out visitor.
    pub const ANONYMOUS: Self = Self {
        is_admin: false,
        is_seller: false,
        is_customer: false,
    };

    /// Capabilities granted to an authenticated account with `role`.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{Capabilities, Role};
    ///
    /// let caps = Capabilities::for_role(Role::Seller);
    /// assert!(caps.is_seller && caps.is_customer && !caps.is_admin);
    /// ```
    pub const fn for_role(role: Role) -> Self {
        Self {
            is_admin: matches!(role, Role::Admin),
            is_seller: matches!(role, Role::Seller | Role::Admin),
            is_customer: true,
        }
    }

    /// Resolve the capabilities of a session state.
    ///
    /// Only an authenticated state grants anything; unresolved, resolving and
    /// anonymous sessions all resolve to [`Capabilities::ANONYMOUS`].
    pub fn resolve(state: &SessionState) -> Self {
        state
            .identity()
            .map_or(Self::ANONYMOUS, |identity| Self::for_role(identity.role()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{Identity, UserId};
    use rstest::rstest;

    fn authenticated(role: Role) -> SessionState {
        let identity = Identity::try_new(UserId::new(1), "user", role, "user@shop.test", "User")
            .expect("fixture identity");
        SessionState::Authenticated(identity)
    }

    #[rstest]
    #[case(Role::Customer)]
    #[case(Role::Seller)]
    #[case(Role::Admin)]
    fn capability_hierarchy_is_monotonic(#[case] role: Role) {
        let caps = Capabilities::resolve(&authenticated(role));
        assert!(!caps.is_admin || caps.is_seller, "admin must imply seller");
        assert!(!caps.is_seller || caps.is_customer, "seller must imply customer");
    }

    #[rstest]
    #[case(Role::Customer, false, false, true)]
    #[case(Role::Seller, false, true, true)]
    #[case(Role::Admin, true, true, true)]
    fn flags_follow_role(
        #[case] role: Role,
        #[case] admin: bool,
        #[case] seller: bool,
        #[case] customer: bool,
    ) {
        let caps = Capabilities::resolve(&authenticated(role));
        assert_eq!(
            caps,
            Capabilities {
                is_admin: admin,
                is_seller: seller,
                is_customer: customer,
            }
        );
    }

    #[rstest]
    #[case(SessionState::Unresolved)]
    #[case(SessionState::Resolving)]
    #[case(SessionState::Anonymous)]
    fn unauthenticated_states_grant_nothing(#[case] state: SessionState) {
        assert_eq!(Capabilities::resolve(&state), Capabilities::ANONYMOUS);
    }
}
