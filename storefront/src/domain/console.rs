//! Seller and admin console actions.
//!
//! Every action is checked against the action gate before a request leaves
//! the client, sent through the session's unauthorized interceptor, and
//! followed by invalidation of the cached queries it makes stale.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::action_gate::{self, ActionControl, GatedAction};
use super::ports::{ApiRequest, StorefrontApi};
use super::{SessionError, SessionStore, UserId, endpoints};

/// New product listing submitted by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    name: String,
    description: String,
    price_cents: u64,
    stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<u64>,
}

impl ProductDraft {
    /// Validate a listing.
    pub fn try_new(
        name: &str,
        description: &str,
        price_cents: u64,
        stock: u32,
    ) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidArgument(
                "product name must not be empty".to_owned(),
            ));
        }
        if price_cents == 0 {
            return Err(SessionError::InvalidArgument(
                "price must be positive".to_owned(),
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            description: description.trim().to_owned(),
            price_cents,
            stock,
            category_id: None,
        })
    }

    /// File the listing under a category.
    #[must_use]
    pub const fn in_category(mut self, category_id: u64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Listing name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// One line of a customer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Product to buy.
    pub product_id: u64,
    /// Units; must be at least one.
    pub quantity: u32,
}

/// Role-gated mutations for the consoles and checkout.
pub struct ConsoleActions<A> {
    session: SessionStore<A>,
}

impl<A> ConsoleActions<A> {
    /// Wrap the session the actions run under.
    pub fn new(session: SessionStore<A>) -> Self {
        Self { session }
    }

    /// How the control for `action` is presented for the current session.
    pub fn control(&self, action: GatedAction) -> ActionControl {
        action_gate::control(action, self.session.capabilities())
    }
}

impl<A> ConsoleActions<A>
where
    A: StorefrontApi + 'static,
{
    async fn perform(
        &self,
        action: GatedAction,
        request: ApiRequest,
        stale: &[&str],
    ) -> Result<Value, SessionError> {
        action_gate::authorize(action, &self.session.snapshot())?;
        let reply = self.session.send(&request).await?;
        let discarded: usize = stale
            .iter()
            .map(|prefix| self.session.cache().invalidate_prefix(prefix))
            .sum();
        info!(
            action = action.as_str(),
            path = %request.path,
            discarded,
            "console action completed"
        );
        Ok(reply)
    }

    /// Publish a pending listing.
    pub async fn approve_product(&self, product_id: u64) -> Result<Value, SessionError> {
        let request = ApiRequest::patch(endpoints::approve_product(product_id));
        self.perform(
            GatedAction::ApproveProduct,
            request,
            &[endpoints::ADMIN_PRODUCTS, endpoints::PRODUCTS],
        )
        .await
    }

    /// Reject a pending listing with a reason shown to the seller.
    pub async fn reject_product(
        &self,
        product_id: u64,
        reason: &str,
    ) -> Result<Value, SessionError> {
        let reason = non_blank(reason, "rejection reason")?;
        let request = ApiRequest::patch(endpoints::reject_product(product_id))
            .with_body(json!({ "reason": reason }));
        self.perform(
            GatedAction::RejectProduct,
            request,
            &[endpoints::ADMIN_PRODUCTS],
        )
        .await
    }

    /// Mark a seller as verified.
    pub async fn verify_seller(&self, seller_id: UserId) -> Result<Value, SessionError> {
        let request = ApiRequest::patch(endpoints::verify_seller(seller_id));
        self.perform(
            GatedAction::VerifySeller,
            request,
            &[endpoints::ADMIN_SELLERS],
        )
        .await
    }

    /// Attach a referral code to a seller.
    pub async fn assign_referral(
        &self,
        seller_id: UserId,
        referral_code: &str,
    ) -> Result<Value, SessionError> {
        let code = non_blank(referral_code, "referral code")?;
        let request = ApiRequest::patch(endpoints::assign_referral(seller_id))
            .with_body(json!({ "referralCode": code }));
        self.perform(
            GatedAction::AssignReferral,
            request,
            &[endpoints::ADMIN_SELLERS],
        )
        .await
    }

    /// Approve or decline a withdrawal request.
    pub async fn review_withdrawal(
        &self,
        withdrawal_id: u64,
        approved: bool,
    ) -> Result<Value, SessionError> {
        let request = ApiRequest::patch(endpoints::review_withdrawal(withdrawal_id))
            .with_body(json!({ "approved": approved }));
        self.perform(
            GatedAction::ReviewWithdrawal,
            request,
            &[endpoints::ADMIN_WITHDRAWALS],
        )
        .await
    }

    /// Submit a listing for moderation.
    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Value, SessionError> {
        let body = serde_json::to_value(draft)
            .map_err(|error| SessionError::InvalidArgument(error.to_string()))?;
        let request = ApiRequest::post(endpoints::SELLER_PRODUCTS, body);
        self.perform(
            GatedAction::CreateProduct,
            request,
            &[endpoints::SELLER_PRODUCTS, endpoints::ADMIN_PRODUCTS],
        )
        .await
    }

    /// Ask for a payout of `amount_cents` from the seller balance.
    pub async fn request_withdrawal(&self, amount_cents: u64) -> Result<Value, SessionError> {
        if amount_cents == 0 {
            return Err(SessionError::InvalidArgument(
                "withdrawal amount must be positive".to_owned(),
            ));
        }
        let request = ApiRequest::post(
            endpoints::SELLER_WITHDRAWALS,
            json!({ "amountCents": amount_cents }),
        );
        self.perform(
            GatedAction::RequestWithdrawal,
            request,
            &[endpoints::SELLER_WITHDRAWALS],
        )
        .await
    }

    /// Check out `lines`.
    pub async fn place_order(&self, lines: &[OrderLine]) -> Result<Value, SessionError> {
        if lines.is_empty() || lines.iter().any(|line| line.quantity == 0) {
            return Err(SessionError::InvalidArgument(
                "an order needs at least one line with a positive quantity".to_owned(),
            ));
        }
        let request = ApiRequest::post(endpoints::ORDERS, json!({ "items": lines }));
        self.perform(
            GatedAction::PlaceOrder,
            request,
            &[endpoints::ORDERS, endpoints::CART],
        )
        .await
    }
}

fn non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str, SessionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(SessionError::InvalidArgument(format!("{what} must not be empty")))
    } else {
        Ok(trimmed)
    }
}
