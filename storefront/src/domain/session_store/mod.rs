//! Session store: the single source of truth for who is logged in.
//!
//! Only the credential flow ([`SessionStore::login`],
//! [`SessionStore::register`], [`SessionStore::logout`]), identity fetches
//! and the unauthorized interceptor write the session. Everything else reads
//! snapshots.
//!
//! ## Ordering
//! - Every commit runs inside `watch::Sender::send_if_modified`, so observers
//!   see whole snapshots only.
//! - Identity fetches and queries are tagged with the session generation at
//!   dispatch and are dropped if the generation moved on before they
//!   completed. Credential commits and expiries advance the generation.
//! - Credential operations take a ticket at dispatch and run one at a time.
//!   A result is published only if no newer ticket was issued meanwhile;
//!   otherwise it is parked as the fallback the newest operation restores
//!   if it fails. Results older than the last published ticket are dropped.
//! - A 401 on an identity fetch that started from a signed-in session ends
//!   the session the same way the unauthorized interceptor does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::ports::{ApiRequest, StorefrontApi, StorefrontApiError};
use super::routes::LOGIN_PATH;
use super::{
    Capabilities, ErrorKind, Identity, LoginCredentials, QueryCache, Registration, Session,
    SessionError, SessionGrant, SessionState, SessionToken,
};

const EVENT_CAPACITY: usize = 16;

/// Notifications for consumers that react to session transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login or registration committed.
    SignedIn {
        /// Username of the new identity.
        username: String,
    },
    /// A logout committed.
    SignedOut,
    /// An authenticated request was refused with 401; navigate to `target`.
    Expired {
        /// Login view to redirect to.
        target: &'static str,
    },
}

/// Outcome of a credential operation waiting to be published.
#[derive(Debug)]
enum Settled {
    Established(SessionGrant),
    Cleared,
}

/// Credential bookkeeping guarded by the credential lock.
#[derive(Debug, Default)]
struct CredentialSlot {
    /// Ticket of the last published outcome.
    committed: u64,
    /// Newest superseded outcome and its ticket.
    fallback: Option<(u64, Settled)>,
}

impl CredentialSlot {
    fn park(&mut self, ticket: u64, settled: Settled) -> bool {
        let newer = ticket > self.committed
            && self
                .fallback
                .as_ref()
                .is_none_or(|(parked, _)| ticket > *parked);
        if newer {
            self.fallback = Some((ticket, settled));
        }
        newer
    }

    fn take_restorable(&mut self) -> Option<(u64, Settled)> {
        let committed = self.committed;
        self.fallback
            .take()
            .filter(|(ticket, _)| *ticket > committed)
    }
}

/// Identity fetch registered by `begin_fetch`.
#[derive(Debug, Clone, Copy)]
struct Fetch {
    generation: u64,
    /// The session was signed in when the fetch started.
    was_authenticated: bool,
}

struct Inner<A> {
    api: Arc<A>,
    state: watch::Sender<Session>,
    token: Mutex<Option<SessionToken>>,
    tickets: AtomicU64,
    credentials: tokio::sync::Mutex<CredentialSlot>,
    cache: QueryCache,
    events: broadcast::Sender<SessionEvent>,
}

/// Cloneable handle to one session.
///
/// Clones share the same state, token, cache and event channel.
pub struct SessionStore<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for SessionStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Generation and token captured when a request is dispatched.
struct Dispatch {
    generation: u64,
    token: Option<SessionToken>,
}

impl<A> SessionStore<A> {
    /// Create an unresolved session backed by `api`.
    pub fn new(api: Arc<A>) -> Self {
        let (state, _) = watch::channel(Session::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                state,
                token: Mutex::new(None),
                tickets: AtomicU64::new(0),
                credentials: tokio::sync::Mutex::new(CredentialSlot::default()),
                cache: QueryCache::new(),
                events,
            }),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Capability flags of the current snapshot.
    pub fn capabilities(&self) -> Capabilities {
        self.inner.state.borrow().capabilities()
    }

    /// Observe committed snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Receive session events emitted after this call.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Response cache shared by every query of this session.
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Whether a bearer token is currently held.
    pub fn has_token(&self) -> bool {
        self.current_token().is_some()
    }

    fn current_token(&self) -> Option<SessionToken> {
        self.inner
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_token(&self, token: Option<SessionToken>) {
        *self
            .inner
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn dispatch(&self) -> Dispatch {
        let generation = self.generation();
        Dispatch {
            generation,
            token: self.current_token(),
        }
    }

    fn generation(&self) -> u64 {
        self.inner.state.borrow().generation()
    }

    /// Apply `update` if the session is still at `generation`.
    fn commit(&self, generation: u64, update: impl FnOnce(&mut Session)) -> bool {
        self.inner.state.send_if_modified(|session| {
            if session.generation() != generation {
                return false;
            }
            update(session);
            true
        })
    }

    /// Move to `Resolving` and register the fetch.
    ///
    /// With `only_if_unstarted`, nothing happens unless no fetch has run yet
    /// for this session and `None` is returned.
    fn begin_fetch(&self, only_if_unstarted: bool) -> Option<Fetch> {
        let mut started = None;
        self.inner.state.send_if_modified(|session| {
            let unstarted =
                matches!(session.state(), SessionState::Unresolved) && session.is_pending();
            if only_if_unstarted && !unstarted {
                return false;
            }
            started = Some(Fetch {
                generation: session.generation(),
                was_authenticated: session.is_authenticated(),
            });
            session.mark_resolving();
            true
        });
        started
    }
}

impl<A: StorefrontApi> SessionStore<A> {
    fn apply_fetch(&self, fetch: Fetch, result: Result<Identity, StorefrontApiError>) {
        let mut expired = false;
        let applied = self.commit(fetch.generation, |session| match result {
            Ok(identity) => session.authenticate(identity),
            Err(error) if error.kind() == ErrorKind::Unauthorized => {
                if fetch.was_authenticated {
                    session.begin_generation();
                    expired = true;
                }
                self.replace_token(None);
                session.clear();
            }
            Err(error) => {
                debug!(error = %error, kind = error.variant_name(), "identity fetch failed");
                session.fail(error);
            }
        });
        if expired {
            self.finish_expiry(fetch.generation);
        } else if !applied {
            debug!(
                generation = fetch.generation,
                "discarding identity response from a superseded generation"
            );
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("no session event subscribers");
        }
    }

    fn publish(&self, settled: Settled) -> Option<Identity> {
        let mut established = None;
        self.inner.state.send_modify(|session| {
            session.begin_generation();
            match settled {
                Settled::Established(SessionGrant { identity, token }) => {
                    self.replace_token(token);
                    session.authenticate(identity.clone());
                    established = Some(identity);
                }
                Settled::Cleared => {
                    self.replace_token(None);
                    session.clear();
                }
            }
        });
        if established.is_none() {
            self.inner.api.forget_session();
        }
        let discarded = self.inner.cache.clear();
        match &established {
            Some(identity) => {
                info!(
                    username = identity.username(),
                    role = %identity.role(),
                    discarded,
                    "session established"
                );
                self.emit(SessionEvent::SignedIn {
                    username: identity.username().to_owned(),
                });
            }
            None => {
                info!(discarded, "session cleared");
                self.emit(SessionEvent::SignedOut);
            }
        }
        established
    }

    fn take_ticket(&self) -> u64 {
        self.inner.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_newest(&self, ticket: u64) -> bool {
        self.inner.tickets.load(Ordering::SeqCst) == ticket
    }

    /// Publish, park or drop the outcome of credential operation `ticket`.
    fn settle(
        &self,
        ticket: u64,
        outcome: Result<Settled, SessionError>,
        slot: &mut CredentialSlot,
    ) -> Result<Option<Identity>, SessionError> {
        let newest = self.is_newest(ticket);
        match outcome {
            Ok(settled) if newest => {
                slot.fallback = None;
                slot.committed = ticket;
                Ok(self.publish(settled))
            }
            Ok(settled) => {
                if slot.park(ticket, settled) {
                    debug!(ticket, "credential result parked behind a newer operation");
                } else {
                    debug!(
                        ticket,
                        committed = slot.committed,
                        "dropping credential result older than the committed one"
                    );
                }
                Err(SessionError::Superseded)
            }
            Err(error) => {
                if newest {
                    if let Some((previous, settled)) = slot.take_restorable() {
                        debug!(ticket, previous, "restoring the last superseded credential result");
                        slot.committed = previous;
                        self.publish(settled);
                    }
                }
                Err(error)
            }
        }
    }

    /// Clear an authenticated session after a 401 on a request dispatched at
    /// `generation`.
    ///
    /// Returns `true` for the one call that performed the clear and emitted
    /// the redirect; 401s from the same generation that arrive later, and
    /// 401s while not authenticated, return `false`.
    pub fn expire(&self, generation: u64) -> bool {
        let expired = self.inner.state.send_if_modified(|session| {
            if session.generation() != generation || !session.is_authenticated() {
                return false;
            }
            session.begin_generation();
            self.replace_token(None);
            session.clear();
            true
        });
        if expired {
            self.finish_expiry(generation);
        }
        expired
    }

    /// Drop everything tied to the expired session and request the redirect.
    fn finish_expiry(&self, generation: u64) {
        self.inner.api.forget_session();
        let discarded = self.inner.cache.clear();
        warn!(generation, discarded, "session expired; redirecting to login");
        self.emit(SessionEvent::Expired {
            target: LOGIN_PATH,
        });
    }

    fn intercept<T>(
        &self,
        generation: u64,
        result: Result<T, StorefrontApiError>,
    ) -> Result<T, SessionError> {
        match result {
            Err(error) if error.kind() == ErrorKind::Unauthorized => {
                self.expire(generation);
                Err(error.into())
            }
            other => other.map_err(SessionError::from),
        }
    }
}

impl<A> SessionStore<A>
where
    A: StorefrontApi + 'static,
{
    /// Ask the API who is logged in.
    ///
    /// The request runs on its own task: dropping the returned future does
    /// not cancel it, and its result still reaches every other observer.
    /// Failures are recorded on the session rather than returned.
    pub async fn fetch_current_identity(&self) -> Session {
        match self.begin_fetch(false) {
            Some(fetch) => self.run_fetch(fetch).await,
            None => self.snapshot(),
        }
    }

    /// Resolve the session if nobody has yet, joining any fetch in flight.
    ///
    /// Settled sessions, including ones whose last fetch failed, are
    /// returned as they are.
    pub async fn ensure_resolved(&self) -> Session {
        match self.begin_fetch(true) {
            Some(fetch) => self.run_fetch(fetch).await,
            None => self.wait_until_settled().await,
        }
    }

    async fn wait_until_settled(&self) -> Session {
        let mut receiver = self.subscribe();
        let settled = receiver
            .wait_for(|session| !matches!(session.state(), SessionState::Resolving))
            .await
            .map(|session| Session::clone(&session));
        settled.unwrap_or_else(|_| self.snapshot())
    }

    async fn run_fetch(&self, fetch: Fetch) -> Session {
        let store = self.clone();
        let token = self.current_token();
        let task = tokio::spawn(async move {
            let result = store.inner.api.current_user(token).await;
            store.apply_fetch(fetch, result);
        });
        if let Err(error) = task.await {
            warn!(error = %error, "identity fetch task did not complete");
            self.apply_fetch(
                fetch,
                Err(StorefrontApiError::transport("identity fetch aborted")),
            );
        }
        self.snapshot()
    }

    /// Log in. On failure the session is left as it was and the server's
    /// message is returned verbatim.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Identity, SessionError> {
        let ticket = self.take_ticket();
        let mut slot = self.inner.credentials.lock().await;
        debug!(ticket, username = credentials.username(), "login dispatched");
        let outcome = self
            .inner
            .api
            .login(credentials)
            .await
            .map(Settled::Established)
            .map_err(SessionError::from);
        self.settle_identity(ticket, outcome, &mut slot)
    }

    /// Register and log in as the new account.
    pub async fn register(&self, registration: &Registration) -> Result<Identity, SessionError> {
        let ticket = self.take_ticket();
        let mut slot = self.inner.credentials.lock().await;
        debug!(ticket, username = registration.username(), "registration dispatched");
        let outcome = self
            .inner
            .api
            .register(registration)
            .await
            .map(Settled::Established)
            .map_err(SessionError::from);
        self.settle_identity(ticket, outcome, &mut slot)
    }

    fn settle_identity(
        &self,
        ticket: u64,
        outcome: Result<Settled, SessionError>,
        slot: &mut CredentialSlot,
    ) -> Result<Identity, SessionError> {
        match self.settle(ticket, outcome, slot)? {
            Some(identity) => Ok(identity),
            None => Err(SessionError::Superseded),
        }
    }

    /// Log out.
    ///
    /// The logout request is best-effort: its failure is logged and the
    /// local session, token and cache are cleared regardless.
    pub async fn logout(&self) -> Session {
        let ticket = self.take_ticket();
        let mut slot = self.inner.credentials.lock().await;
        if let Err(error) = self.inner.api.logout(self.current_token()).await {
            warn!(error = %error, "logout request failed; clearing local session anyway");
        }
        if let Err(error) = self.settle(ticket, Ok(Settled::Cleared), &mut slot) {
            debug!(ticket, error = %error, "logout superseded by a newer credential operation");
        }
        self.snapshot()
    }

    /// `GET` a resource through the cache and the unauthorized interceptor.
    pub async fn query(&self, path: &str) -> Result<Value, SessionError> {
        let Dispatch { generation, token } = self.dispatch();
        if let Some(cached) = self.inner.cache.get(path, generation) {
            debug!(path, "query served from cache");
            return Ok(cached);
        }
        let result = self.inner.api.fetch(path, token).await;
        let value = self.intercept(generation, result)?;
        if self.generation() == generation {
            self.inner.cache.insert(path, generation, value.clone());
        }
        Ok(value)
    }

    /// Send a state-changing request through the unauthorized interceptor.
    pub async fn send(&self, request: &ApiRequest) -> Result<Value, SessionError> {
        let Dispatch { generation, token } = self.dispatch();
        let result = self.inner.api.send(request, token).await;
        self.intercept(generation, result)
    }
}

#[cfg(test)]
mod tests;
