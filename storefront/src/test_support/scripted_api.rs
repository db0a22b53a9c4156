//! In-memory storefront API double with controllable timing.
//!
//! `mockall` expectations answer immediately, which cannot express "this
//! login completes after that one". The scripted double keeps accounts and
//! sessions in memory, enforces the same role rules as the server and lets
//! a test hold individual responses until it releases them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::domain::ports::{ApiRequest, StorefrontApi, StorefrontApiError};
use crate::domain::{
    Identity, LoginCredentials, Registration, Role, SessionGrant, SessionToken, UserId, endpoints,
};

/// Build a valid identity for tests.
///
/// # Panics
/// Panics if `username` is blank.
pub fn fixture_identity(id: u64, username: &str, role: Role) -> Identity {
    match Identity::try_new(
        UserId::new(id),
        username,
        role,
        format!("{username}@shop.test"),
        username,
    ) {
        Ok(identity) => identity,
        Err(error) => panic!("fixture identity {username}: {error}"),
    }
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

#[derive(Default)]
struct Ledger {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, String>,
    login_gates: HashMap<String, Arc<Semaphore>>,
    identity_gate: Option<Arc<Semaphore>>,
    logout_gate: Option<Arc<Semaphore>>,
    identity_failure: Option<StorefrontApiError>,
    resources: HashMap<String, Value>,
    calls: HashMap<String, usize>,
    sent: Vec<ApiRequest>,
}

/// Scripted [`StorefrontApi`] implementation.
#[derive(Default)]
pub struct ScriptedStorefrontApi {
    ledger: Mutex<Ledger>,
    next_token: AtomicU64,
    next_user: AtomicU64,
    fail_logout: AtomicBool,
    forgotten: AtomicU64,
}

impl ScriptedStorefrontApi {
    /// Empty double with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("scripted api ledger mutex"),
        }
    }

    /// Add an account; ids are assigned in insertion order from 1.
    pub fn with_account(self, username: &str, password: &str, role: Role) -> Self {
        let id = self.next_user.fetch_add(1, Ordering::SeqCst) + 1;
        let identity = fixture_identity(id, username, role);
        self.ledger().accounts.insert(
            username.to_owned(),
            Account {
                password: password.to_owned(),
                identity,
            },
        );
        self
    }

    /// Serve `value` for `GET path`.
    pub fn with_resource(self, path: &str, value: Value) -> Self {
        self.ledger().resources.insert(path.to_owned(), value);
        self
    }

    /// Hold logins for `username` until [`Self::release_login`] is called.
    pub fn hold_logins_for(&self, username: &str) {
        self.ledger()
            .login_gates
            .insert(username.to_owned(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held login for `username` complete.
    pub fn release_login(&self, username: &str) {
        if let Some(gate) = self.ledger().login_gates.get(username) {
            gate.add_permits(1);
        }
    }

    /// Hold identity fetches until [`Self::release_identity`] is called.
    pub fn hold_identity(&self) {
        self.ledger().identity_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held identity fetch complete.
    pub fn release_identity(&self) {
        if let Some(gate) = &self.ledger().identity_gate {
            gate.add_permits(1);
        }
    }

    /// Answer the next identity fetches with `error` instead of looking up
    /// the token.
    pub fn fail_identity_with(&self, error: StorefrontApiError) {
        self.ledger().identity_failure = Some(error);
    }

    /// Hold logout requests until [`Self::release_logout`] is called.
    pub fn hold_logouts(&self) {
        self.ledger().logout_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held logout complete.
    pub fn release_logout(&self) {
        if let Some(gate) = &self.ledger().logout_gate {
            gate.add_permits(1);
        }
    }

    /// Make logout requests fail with a 500.
    pub fn fail_logout(&self) {
        self.fail_logout.store(true, Ordering::SeqCst);
    }

    /// Forget every server-side session, as if they all expired.
    pub fn revoke_sessions(&self) {
        self.ledger().sessions.clear();
    }

    /// Number of live server-side sessions.
    pub fn live_sessions(&self) -> usize {
        self.ledger().sessions.len()
    }

    /// How many times the store asked the adapter to forget its session.
    pub fn forgotten_sessions(&self) -> u64 {
        self.forgotten.load(Ordering::SeqCst)
    }

    /// How many times `path` was requested through `fetch` or `send`.
    pub fn calls(&self, path: &str) -> usize {
        self.ledger().calls.get(path).copied().unwrap_or_default()
    }

    /// State-changing requests received so far.
    pub fn sent(&self) -> Vec<ApiRequest> {
        self.ledger().sent.clone()
    }

    fn issue_token(&self, ledger: &mut Ledger, username: &str) -> Option<SessionToken> {
        let serial = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let raw = format!("token-{serial}");
        ledger.sessions.insert(raw.clone(), username.to_owned());
        SessionToken::new(raw)
    }

    fn identity_for(ledger: &Ledger, token: Option<&SessionToken>) -> Option<Identity> {
        let username = ledger.sessions.get(token?.expose())?;
        ledger
            .accounts
            .get(username)
            .map(|account| account.identity.clone())
    }

    fn authorize_path(
        ledger: &Ledger,
        path: &str,
        token: Option<&SessionToken>,
    ) -> Result<(), StorefrontApiError> {
        if endpoints::is_public(path) {
            return Ok(());
        }
        let identity = Self::identity_for(ledger, token)
            .ok_or_else(|| StorefrontApiError::unauthorized("Not authenticated"))?;
        let role = identity.role();
        if path.starts_with("/api/admin") && role != Role::Admin {
            return Err(StorefrontApiError::forbidden("Admin access required"));
        }
        if path.starts_with("/api/seller") && role == Role::Customer {
            return Err(StorefrontApiError::forbidden("Seller access required"));
        }
        Ok(())
    }

    fn record_call(ledger: &mut Ledger, path: &str) {
        *ledger.calls.entry(path.to_owned()).or_default() += 1;
    }
}

async fn pass_gate(gate: Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        match gate.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => panic!("scripted api gate closed"),
        }
    }
}

#[async_trait]
impl StorefrontApi for ScriptedStorefrontApi {
    async fn current_user(
        &self,
        token: Option<SessionToken>,
    ) -> Result<Identity, StorefrontApiError> {
        let gate = self.ledger().identity_gate.clone();
        pass_gate(gate).await;
        let ledger = self.ledger();
        if let Some(error) = ledger.identity_failure.clone() {
            return Err(error);
        }
        Self::identity_for(&ledger, token.as_ref())
            .ok_or_else(|| StorefrontApiError::unauthorized("Not authenticated"))
    }

    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<SessionGrant, StorefrontApiError> {
        let gate = self.ledger().login_gates.get(credentials.username()).cloned();
        pass_gate(gate).await;
        let mut ledger = self.ledger();
        let account = ledger
            .accounts
            .get(credentials.username())
            .filter(|account| account.password == credentials.password())
            .cloned()
            .ok_or_else(|| StorefrontApiError::unauthorized("Invalid username or password"))?;
        let token = self.issue_token(&mut ledger, credentials.username());
        Ok(SessionGrant {
            identity: account.identity,
            token,
        })
    }

    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<SessionGrant, StorefrontApiError> {
        let mut ledger = self.ledger();
        if ledger.accounts.contains_key(registration.username()) {
            return Err(StorefrontApiError::validation(
                400_u16,
                "Username already exists",
            ));
        }
        let id = self.next_user.fetch_add(1, Ordering::SeqCst) + 1;
        let identity = Identity::try_new(
            UserId::new(id),
            registration.username(),
            registration.role(),
            registration.email(),
            registration.display_name(),
        )
        .map_err(|error| StorefrontApiError::validation(400_u16, error.to_string()))?;
        ledger.accounts.insert(
            registration.username().to_owned(),
            Account {
                password: registration.password().to_owned(),
                identity: identity.clone(),
            },
        );
        let token = self.issue_token(&mut ledger, registration.username());
        Ok(SessionGrant { identity, token })
    }

    async fn logout(&self, token: Option<SessionToken>) -> Result<(), StorefrontApiError> {
        let gate = self.ledger().logout_gate.clone();
        pass_gate(gate).await;
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(StorefrontApiError::server(500_u16, "Logout failed"));
        }
        if let Some(token) = token {
            self.ledger().sessions.remove(token.expose());
        }
        Ok(())
    }

    async fn fetch(
        &self,
        path: &str,
        token: Option<SessionToken>,
    ) -> Result<Value, StorefrontApiError> {
        let mut ledger = self.ledger();
        Self::record_call(&mut ledger, path);
        Self::authorize_path(&ledger, path, token.as_ref())?;
        Ok(ledger
            .resources
            .get(path)
            .cloned()
            .unwrap_or_else(|| json!({ "path": path })))
    }

    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<SessionToken>,
    ) -> Result<Value, StorefrontApiError> {
        let mut ledger = self.ledger();
        Self::record_call(&mut ledger, &request.path);
        Self::authorize_path(&ledger, &request.path, token.as_ref())?;
        ledger.sent.push(request.clone());
        Ok(json!({ "ok": true }))
    }

    fn forget_session(&self) {
        self.forgotten.fetch_add(1, Ordering::SeqCst);
    }
}
