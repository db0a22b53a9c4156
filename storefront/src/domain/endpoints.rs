//! REST endpoint table.
//!
//! Paths are relative to the API base URL. Identifier-bearing endpoints are
//! built by the helper functions so call sites never format paths by hand.

use super::UserId;

/// `POST`: exchange credentials for a session.
pub const LOGIN: &str = "/api/login";
/// `POST`: end the session.
pub const LOGOUT: &str = "/api/logout";
/// `POST`: create an account and a session.
pub const REGISTER: &str = "/api/register";
/// `GET`: identity of the current session, or 401.
pub const CURRENT_USER: &str = "/api/user";

/// `GET`: public product catalog.
pub const PRODUCTS: &str = "/api/products";
/// `GET`: public category list.
pub const CATEGORIES: &str = "/api/categories";
/// `GET`/`POST`: the signed-in customer's cart.
pub const CART: &str = "/api/cart";
/// `GET`/`POST`: the signed-in customer's orders.
pub const ORDERS: &str = "/api/orders";

/// `GET`/`POST`: the seller's own products.
pub const SELLER_PRODUCTS: &str = "/api/seller/products";
/// `GET`: orders containing the seller's products.
pub const SELLER_ORDERS: &str = "/api/seller/orders";
/// `GET`/`POST`: the seller's withdrawal requests.
pub const SELLER_WITHDRAWALS: &str = "/api/seller/withdrawals";

/// `GET`: products awaiting moderation.
pub const ADMIN_PRODUCTS: &str = "/api/admin/products";
/// `GET`: seller accounts.
pub const ADMIN_SELLERS: &str = "/api/admin/sellers";
/// `GET`: withdrawal requests from every seller.
pub const ADMIN_WITHDRAWALS: &str = "/api/admin/withdrawals";

/// Path prefixes anyone may read without a session.
pub const PUBLIC_PREFIXES: [&str; 2] = [PRODUCTS, CATEGORIES];

/// `PATCH`: approve a pending product listing.
pub fn approve_product(product_id: u64) -> String {
    format!("{ADMIN_PRODUCTS}/{product_id}/approve")
}

/// `PATCH`: reject a pending product listing.
pub fn reject_product(product_id: u64) -> String {
    format!("{ADMIN_PRODUCTS}/{product_id}/reject")
}

/// `PATCH`: mark a seller account as verified.
pub fn verify_seller(seller_id: UserId) -> String {
    format!("{ADMIN_SELLERS}/{seller_id}/verify")
}

/// `PATCH`: attach a referral code to a seller.
pub fn assign_referral(seller_id: UserId) -> String {
    format!("{ADMIN_SELLERS}/{seller_id}/assign-referral")
}

/// `PATCH`: approve or decline a withdrawal request.
pub fn review_withdrawal(withdrawal_id: u64) -> String {
    format!("{ADMIN_WITHDRAWALS}/{withdrawal_id}/review")
}

/// Whether `path` is readable without a session.
pub fn is_public(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    })
}
