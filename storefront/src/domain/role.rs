//! Closed set of account roles.
//!
//! Every capability check in the crate starts from a [`Role`]; raw role
//! strings from the API are parsed here once and never compared ad hoc.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account role reported by the storefront API.
///
/// Roles are ordered by privilege: `Customer < Seller < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper with a cart, orders and an account page.
    Customer,
    /// Merchant managing products, orders and payouts.
    Seller,
    /// Operator moderating products, sellers, referrals and withdrawals.
    Admin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::Customer, Self::Seller, Self::Admin];

    /// Wire name of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRoleError(value.to_owned())),
        }
    }
}
