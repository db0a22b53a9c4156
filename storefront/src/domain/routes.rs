//! Static route table for the storefront, seller console and admin console.
//!
//! The table is built once at startup and never mutated. Each descriptor
//! pairs a path pattern with the capability its view requires; navigation
//! matches the path, then hands the requirement to [`guard::decide`].

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::guard::{self, GuardDecision, RequiredCapability};
use super::Session;

/// Storefront landing page.
pub const HOME_PATH: &str = "/";
/// Login and sign-up view.
pub const LOGIN_PATH: &str = "/auth";
/// Seller onboarding view.
pub const SELLER_REGISTRATION_PATH: &str = "/seller/register";

/// Views the router can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    /// Landing page with featured products.
    Home,
    /// Single product page.
    ProductDetail,
    /// Products in one category.
    Category,
    /// Search results.
    Search,
    /// Cart contents.
    Cart,
    /// Login and sign-up.
    Auth,
    /// Payment and shipping.
    Checkout,
    /// Customer order history.
    Orders,
    /// Profile and settings.
    Account,
    /// Seller onboarding form.
    SellerRegistration,
    /// Seller overview.
    SellerDashboard,
    /// Seller product list.
    SellerProducts,
    /// New product form.
    SellerProductEditor,
    /// Orders for the seller's products.
    SellerOrders,
    /// Balance and withdrawal requests.
    SellerPayouts,
    /// Admin overview.
    AdminDashboard,
    /// Product moderation queue.
    AdminProducts,
    /// Seller verification.
    AdminSellers,
    /// Referral code management.
    AdminReferrals,
    /// Withdrawal review.
    AdminWithdrawals,
    /// Fallback for unmatched paths.
    NotFound,
}

/// Raised when a route pattern is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutePatternError {
    /// Pattern did not start with `/`.
    #[error("route pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),
    /// `*` appeared before the last segment.
    #[error("route pattern `{0}` may only use `*` as its last segment")]
    MisplacedWildcard(String),
    /// `:` with no parameter name.
    #[error("route pattern `{0}` has an unnamed parameter")]
    UnnamedParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest,
}

/// Parsed path pattern: literal segments, `:name` captures and a trailing
/// `*`.
///
/// # Examples
/// ```
/// use storefront::domain::PathPattern;
///
/// let pattern = PathPattern::parse("/products/:slug").expect("valid pattern");
/// let params = pattern.matches("/products/wireless-earbuds").expect("match");
/// assert_eq!(params.get("slug").map(String::as_str), Some("wireless-earbuds"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern.
    pub fn parse(raw: &str) -> Result<Self, RoutePatternError> {
        let Some(body) = raw.strip_prefix('/') else {
            return Err(RoutePatternError::MissingLeadingSlash(raw.to_owned()));
        };
        let parts = split_segments(body);
        let last = parts.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(parts.len());
        for (index, part) in parts.into_iter().enumerate() {
            let segment = match part {
                "*" if index == last => Segment::Rest,
                "*" => return Err(RoutePatternError::MisplacedWildcard(raw.to_owned())),
                _ => match part.strip_prefix(':') {
                    Some("") => return Err(RoutePatternError::UnnamedParameter(raw.to_owned())),
                    Some(name) => Segment::Param(name.to_owned()),
                    None => Segment::Literal(part.to_owned()),
                },
            };
            segments.push(segment);
        }
        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    /// Pattern text as written.
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Match a concrete path, returning captured parameters.
    ///
    /// Query strings and fragments are ignored; trailing slashes are not
    /// significant.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let parts = split_segments(path.strip_prefix('/')?);
        let mut params = BTreeMap::new();
        let mut parts_iter = parts.iter();
        for segment in &self.segments {
            match segment {
                Segment::Rest => {
                    let rest = parts_iter.by_ref().copied().collect::<Vec<_>>().join("/");
                    params.insert("*".to_owned(), rest);
                    return Some(params);
                }
                Segment::Literal(literal) => {
                    if parts_iter.next()? != literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), (*parts_iter.next()?).to_owned());
                }
            }
        }
        parts_iter.next().is_none().then_some(params)
    }
}

fn split_segments(body: &str) -> Vec<&str> {
    body.split('/').filter(|part| !part.is_empty()).collect()
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Path pattern.
    pub pattern: PathPattern,
    /// Capability the view requires.
    pub required: RequiredCapability,
    /// View to render.
    pub view: View,
}

/// Result of resolving a path against the table and the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    /// Path as requested.
    pub path: String,
    /// Matched view ([`View::NotFound`] when nothing matched).
    pub view: View,
    /// Requirement of the matched route.
    pub required: RequiredCapability,
    /// Captured path parameters.
    pub params: BTreeMap<String, String>,
    /// Guard outcome.
    pub decision: GuardDecision,
}

/// Ordered, immutable route table. The first matching pattern wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Build a table from `(pattern, requirement, view)` triples.
    pub fn new<'a>(
        entries: impl IntoIterator<Item = (&'a str, RequiredCapability, View)>,
    ) -> Result<Self, RoutePatternError> {
        let routes = entries
            .into_iter()
            .map(|(pattern, required, view)| {
                Ok(RouteDescriptor {
                    pattern: PathPattern::parse(pattern)?,
                    required,
                    view,
                })
            })
            .collect::<Result<Vec<_>, RoutePatternError>>()?;
        Ok(Self { routes })
    }

    /// The storefront's route table.
    pub fn storefront() -> Result<Self, RoutePatternError> {
        use RequiredCapability::{AdminOnly, Authenticated, Public, SellerOrAdmin};
        Self::new([
            (HOME_PATH, Public, View::Home),
            ("/products/:slug", Public, View::ProductDetail),
            ("/category/:slug", Public, View::Category),
            ("/search", Public, View::Search),
            ("/cart", Public, View::Cart),
            (LOGIN_PATH, Public, View::Auth),
            ("/checkout", Authenticated, View::Checkout),
            ("/orders", Authenticated, View::Orders),
            ("/orders/:id", Authenticated, View::Orders),
            ("/account", Authenticated, View::Account),
            (SELLER_REGISTRATION_PATH, Public, View::SellerRegistration),
            ("/seller", SellerOrAdmin, View::SellerDashboard),
            ("/seller/dashboard", SellerOrAdmin, View::SellerDashboard),
            ("/seller/products", SellerOrAdmin, View::SellerProducts),
            ("/seller/products/new", SellerOrAdmin, View::SellerProductEditor),
            ("/seller/orders", SellerOrAdmin, View::SellerOrders),
            ("/seller/payouts", SellerOrAdmin, View::SellerPayouts),
            ("/admin", AdminOnly, View::AdminDashboard),
            ("/admin/products", AdminOnly, View::AdminProducts),
            ("/admin/sellers", AdminOnly, View::AdminSellers),
            ("/admin/referrals", AdminOnly, View::AdminReferrals),
            ("/admin/withdrawals", AdminOnly, View::AdminWithdrawals),
            ("/admin/*", AdminOnly, View::NotFound),
            ("/seller/*", SellerOrAdmin, View::NotFound),
        ])
    }

    /// Registered routes in match order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// First route whose pattern matches `path`, with its captures.
    pub fn resolve(&self, path: &str) -> Option<(&RouteDescriptor, BTreeMap<String, String>)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    /// Resolve `path` and evaluate its guard against `session`.
    ///
    /// Unknown paths render [`View::NotFound`] publicly. Unknown paths under
    /// `/admin` and `/seller` are caught by the console wildcards first, so
    /// probing them reveals nothing to visitors without the capability.
    pub fn navigate(&self, path: &str, session: &Session) -> Navigation {
        let (view, required, params) = match self.resolve(path) {
            Some((route, params)) => (route.view, route.required, params),
            None => (View::NotFound, RequiredCapability::Public, BTreeMap::new()),
        };
        Navigation {
            path: path.to_owned(),
            view,
            required,
            params,
            decision: guard::decide(required, session),
        }
    }
}
