//! Session resolution and role-based access control.
//!
//! Purpose: own the one authoritative session value, derive capability
//! flags from it, and decide what views and console actions a session may
//! reach. Nothing here performs I/O directly; the REST API is reached
//! through [`ports::StorefrontApi`].
//!
//! Public surface:
//! - [`SessionStore`]: credential flow, identity fetches, cached queries and
//!   the unauthorized interceptor.
//! - [`Capabilities`]: flags derived from a [`Session`] snapshot.
//! - [`guard::decide`] and [`RouteTable`]: navigation decisions.
//! - [`action_gate`] and [`ConsoleActions`]: per-action controls and the
//!   console service that enforces them.

pub mod action_gate;
mod auth;
mod capabilities;
mod console;
pub mod endpoints;
mod error;
pub mod guard;
mod identity;
mod localization;
pub mod ports;
mod query_cache;
mod role;
pub mod routes;
mod session;
mod session_store;

pub use self::action_gate::{ActionControl, GatedAction};
pub use self::auth::{
    CredentialValidationError, LoginCredentials, Registration, SessionGrant, SessionToken,
};
pub use self::capabilities::Capabilities;
pub use self::console::{ConsoleActions, OrderLine, ProductDraft};
pub use self::error::{ErrorKind, SessionError};
pub use self::guard::{GuardDecision, RequiredCapability};
pub use self::identity::{Identity, IdentityValidationError, UserId};
pub use self::localization::{Locale, UnsupportedLocaleError};
pub use self::query_cache::QueryCache;
pub use self::role::{Role, UnknownRoleError};
pub use self::routes::{Navigation, PathPattern, RouteDescriptor, RouteTable, View};
pub use self::session::{Session, SessionState};
pub use self::session_store::{SessionEvent, SessionStore};
