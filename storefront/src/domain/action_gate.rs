//! Action gate: the route-guard rules applied to individual console actions.

use serde::Serialize;

use super::guard::RequiredCapability;
use super::{Capabilities, Session, SessionError};

/// In-page actions whose controls depend on the session's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatedAction {
    /// Publish a pending product listing.
    ApproveProduct,
    /// Reject a pending product listing.
    RejectProduct,
    /// Mark a seller account as verified.
    VerifySeller,
    /// Attach a referral code to a seller.
    AssignReferral,
    /// Approve or decline a seller's withdrawal.
    ReviewWithdrawal,
    /// List a new product.
    CreateProduct,
    /// Ask for a payout of the seller balance.
    RequestWithdrawal,
    /// Check out the cart.
    PlaceOrder,
}

impl GatedAction {
    /// Every gated action.
    pub const ALL: [Self; 8] = [
        Self::ApproveProduct,
        Self::RejectProduct,
        Self::VerifySeller,
        Self::AssignReferral,
        Self::ReviewWithdrawal,
        Self::CreateProduct,
        Self::RequestWithdrawal,
        Self::PlaceOrder,
    ];

    /// Capability the action requires.
    pub const fn required(self) -> RequiredCapability {
        match self {
            Self::ApproveProduct
            | Self::RejectProduct
            | Self::VerifySeller
            | Self::AssignReferral
            | Self::ReviewWithdrawal => RequiredCapability::AdminOnly,
            Self::CreateProduct | Self::RequestWithdrawal => RequiredCapability::SellerOrAdmin,
            Self::PlaceOrder => RequiredCapability::Authenticated,
        }
    }

    /// Kebab-case name used in logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApproveProduct => "approve-product",
            Self::RejectProduct => "reject-product",
            Self::VerifySeller => "verify-seller",
            Self::AssignReferral => "assign-referral",
            Self::ReviewWithdrawal => "review-withdrawal",
            Self::CreateProduct => "create-product",
            Self::RequestWithdrawal => "request-withdrawal",
            Self::PlaceOrder => "place-order",
        }
    }
}

/// How a control for an action is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionControl {
    /// Shown and usable.
    Enabled,
    /// Shown greyed out; the user could gain the capability (log in,
    /// become a seller).
    Disabled,
    /// Omitted entirely.
    Hidden,
}

/// Decide how the control for `action` is presented.
///
/// Admin actions are hidden from everyone else; seller and customer actions
/// are disabled so the path to gaining the capability stays visible.
///
/// # Examples
/// ```
/// use storefront::domain::{ActionControl, Capabilities, GatedAction, Role, action_gate};
///
/// let caps = Capabilities::for_role(Role::Seller);
/// assert_eq!(action_gate::control(GatedAction::ApproveProduct, caps), ActionControl::Hidden);
/// assert_eq!(action_gate::control(GatedAction::CreateProduct, caps), ActionControl::Enabled);
/// ```
pub const fn control(action: GatedAction, capabilities: Capabilities) -> ActionControl {
    let required = action.required();
    if required.is_met(capabilities) {
        ActionControl::Enabled
    } else if matches!(required, RequiredCapability::AdminOnly) {
        ActionControl::Hidden
    } else {
        ActionControl::Disabled
    }
}

/// Refuse `action` unless `session` holds its capability.
///
/// Called before any request leaves the client, so a missing capability is
/// never silently permitted.
pub fn authorize(action: GatedAction, session: &Session) -> Result<(), SessionError> {
    if action.required().is_met(session.capabilities()) {
        Ok(())
    } else {
        tracing::debug!(
            action = action.as_str(),
            state = session.state().label(),
            "gated action refused"
        );
        Err(SessionError::Forbidden { action })
    }
}
