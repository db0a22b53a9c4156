//! Tests for the session store.

use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::domain::ports::MockStorefrontApi;
use crate::domain::{Role, endpoints};
use crate::test_support::{ScriptedStorefrontApi, fixture_identity};

fn credentials(username: &str, password: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts(username, password).expect("valid credentials")
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return seen,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

#[fixture]
fn api() -> Arc<ScriptedStorefrontApi> {
    Arc::new(
        ScriptedStorefrontApi::new()
            .with_account("admin", "admin123", Role::Admin)
            .with_account("seller1", "seller123", Role::Seller)
            .with_account("customer1", "customer123", Role::Customer),
    )
}

#[rstest]
#[tokio::test]
async fn starts_unresolved_with_no_capabilities(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    let session = store.snapshot();
    assert_eq!(session.state(), &SessionState::Unresolved);
    assert!(session.is_pending());
    assert_eq!(store.capabilities(), Capabilities::ANONYMOUS);
}

#[rstest]
#[tokio::test]
async fn login_commits_identity_and_emits_signed_in(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    let mut events = store.events();

    let identity = store
        .login(&credentials("seller1", "seller123"))
        .await
        .expect("login succeeds");

    assert_eq!(identity.role(), Role::Seller);
    let session = store.snapshot();
    assert_eq!(session.identity(), Some(&identity));
    assert_eq!(session.generation(), 1);
    assert!(store.has_token());
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::SignedIn {
            username: "seller1".into()
        }]
    );
}

#[rstest]
#[tokio::test]
async fn failed_login_leaves_session_unchanged(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    store
        .login(&credentials("customer1", "customer123"))
        .await
        .expect("first login succeeds");
    let before = store.snapshot();

    let err = store
        .login(&credentials("admin", "wrong"))
        .await
        .expect_err("bad password");

    assert_eq!(err.user_message(crate::domain::Locale::En), "Invalid username or password");
    assert_eq!(store.snapshot(), before);
}

#[rstest]
#[tokio::test]
async fn later_started_login_wins(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    api.hold_logins_for("admin");
    api.hold_logins_for("seller1");
    let admin = credentials("admin", "admin123");
    let seller = credentials("seller1", "seller123");

    let (first, second, ()) = tokio::join!(store.login(&admin), store.login(&seller), async {
        tokio::task::yield_now().await;
        api.release_login("admin");
        api.release_login("seller1");
    });

    assert_eq!(first, Err(SessionError::Superseded));
    assert_eq!(second.expect("newest login").username(), "seller1");
    assert_eq!(
        store.snapshot().identity().map(Identity::username),
        Some("seller1")
    );
}

#[rstest]
#[tokio::test]
async fn failed_newest_login_restores_superseded_result(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    api.hold_logins_for("admin");
    let admin = credentials("admin", "admin123");
    let wrong = credentials("seller1", "nope");

    let (first, second, ()) = tokio::join!(store.login(&admin), store.login(&wrong), async {
        tokio::task::yield_now().await;
        api.release_login("admin");
    });

    assert_eq!(first, Err(SessionError::Superseded));
    assert!(second.is_err());
    assert_eq!(
        store.snapshot().identity().map(Identity::username),
        Some("admin")
    );
}

#[rstest]
#[tokio::test]
async fn logout_followed_by_failed_login_stays_signed_out(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    store
        .login(&credentials("admin", "admin123"))
        .await
        .expect("login succeeds");
    api.hold_logouts();
    let wrong = credentials("seller1", "nope");

    let (session, login, ()) = tokio::join!(store.logout(), store.login(&wrong), async {
        tokio::task::yield_now().await;
        api.release_logout();
    });

    assert!(login.is_err());
    assert_eq!(store.snapshot().state(), &SessionState::Anonymous);
    assert!(!session.is_authenticated());
}

#[rstest]
#[tokio::test]
async fn fetch_restores_session_from_token(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    store
        .login(&credentials("admin", "admin123"))
        .await
        .expect("login succeeds");

    let session = store.fetch_current_identity().await;

    assert!(session.capabilities().is_admin);
    assert_eq!(session.generation(), 1);
}

#[rstest]
#[tokio::test]
async fn fetch_without_session_resolves_anonymous_silently(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    let mut events = store.events();

    let session = store.fetch_current_identity().await;

    assert_eq!(session.state(), &SessionState::Anonymous);
    assert!(session.error().is_none());
    assert!(drain(&mut events).is_empty());
}

#[rstest]
#[tokio::test]
async fn fetch_transport_failure_is_recorded_not_returned(api: Arc<ScriptedStorefrontApi>) {
    api.fail_identity_with(StorefrontApiError::transport("connection refused"));
    let store = SessionStore::new(api);

    let session = store.fetch_current_identity().await;

    assert_eq!(session.state(), &SessionState::Unresolved);
    assert!(!session.is_pending());
    assert_eq!(
        session.error(),
        Some(&StorefrontApiError::transport("connection refused"))
    );
}

#[rstest]
#[tokio::test]
async fn logout_discards_identity_fetched_for_previous_generation(
    api: Arc<ScriptedStorefrontApi>,
) {
    let store = SessionStore::new(Arc::clone(&api));
    store
        .login(&credentials("customer1", "customer123"))
        .await
        .expect("login succeeds");
    api.fail_logout();
    api.hold_identity();

    let (fetched, logged_out, ()) =
        tokio::join!(store.fetch_current_identity(), store.logout(), async {
            tokio::task::yield_now().await;
            api.release_identity();
        });

    assert_eq!(logged_out.state(), &SessionState::Anonymous);
    assert_eq!(fetched.state(), &SessionState::Anonymous);
    assert_eq!(store.snapshot().state(), &SessionState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn ensure_resolved_joins_fetch_in_flight(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    api.hold_identity();

    let (first, second, ()) = tokio::join!(store.ensure_resolved(), store.ensure_resolved(), async {
        tokio::task::yield_now().await;
        api.release_identity();
    });

    assert_eq!(first.state(), &SessionState::Anonymous);
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test]
async fn ensure_resolved_keeps_settled_sessions(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    store.fetch_current_identity().await;
    api.fail_identity_with(StorefrontApiError::timeout("slow"));

    let session = store.ensure_resolved().await;

    assert_eq!(session.state(), &SessionState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn concurrent_unauthorized_responses_expire_once(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    store
        .login(&credentials("customer1", "customer123"))
        .await
        .expect("login succeeds");
    let mut events = store.events();
    api.revoke_sessions();

    let (cart, orders) = tokio::join!(store.query(endpoints::CART), store.query(endpoints::ORDERS));

    assert!(cart.is_err());
    assert!(orders.is_err());
    assert_eq!(store.snapshot().state(), &SessionState::Anonymous);
    assert!(!store.has_token());
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::Expired {
            target: LOGIN_PATH
        }]
    );
}

#[rstest]
#[tokio::test]
async fn unauthorized_while_anonymous_does_not_redirect(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    store.fetch_current_identity().await;
    let mut events = store.events();

    let err = store.query(endpoints::CART).await.expect_err("needs a session");

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(drain(&mut events).is_empty());
}

#[rstest]
#[tokio::test]
async fn forbidden_keeps_the_session(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    store
        .login(&credentials("seller1", "seller123"))
        .await
        .expect("login succeeds");

    let err = store
        .query(endpoints::ADMIN_SELLERS)
        .await
        .expect_err("sellers are not admins");

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(store.snapshot().is_authenticated());
}

#[rstest]
#[tokio::test]
async fn queries_are_cached_per_session(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    store
        .login(&credentials("customer1", "customer123"))
        .await
        .expect("login succeeds");

    store.query(endpoints::ORDERS).await.expect("orders");
    store.query(endpoints::ORDERS).await.expect("orders again");
    assert_eq!(api.calls(endpoints::ORDERS), 1);

    store.logout().await;
    assert!(store.cache().is_empty());
    store
        .login(&credentials("seller1", "seller123"))
        .await
        .expect("second login succeeds");
    store.query(endpoints::ORDERS).await.expect("orders for seller");
    assert_eq!(api.calls(endpoints::ORDERS), 2);
}

#[rstest]
#[tokio::test]
async fn logout_failure_still_clears_locally(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    store
        .login(&credentials("admin", "admin123"))
        .await
        .expect("login succeeds");
    api.fail_logout();
    let mut events = store.events();

    let session = store.logout().await;

    assert_eq!(session.state(), &SessionState::Anonymous);
    assert!(!store.has_token());
    assert_eq!(api.forgotten_sessions(), 1);
    assert_eq!(drain(&mut events), vec![SessionEvent::SignedOut]);
}

#[rstest]
#[tokio::test]
async fn refetch_refused_while_signed_in_expires_the_session(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(Arc::clone(&api));
    store
        .login(&credentials("customer1", "customer123"))
        .await
        .expect("login succeeds");
    store.query(endpoints::ORDERS).await.expect("orders");
    let mut events = store.events();
    api.revoke_sessions();

    let session = store.fetch_current_identity().await;

    assert_eq!(session.state(), &SessionState::Anonymous);
    assert_eq!(session.generation(), 2);
    assert!(!store.has_token());
    assert!(store.cache().is_empty());
    assert_eq!(api.forgotten_sessions(), 1);
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::Expired {
            target: LOGIN_PATH
        }]
    );

    let err = store
        .query(endpoints::ORDERS)
        .await
        .expect_err("orders need a session");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(api.calls(endpoints::ORDERS), 2);
    assert!(drain(&mut events).is_empty());
}

#[rstest]
#[tokio::test]
async fn results_older_than_the_committed_one_are_never_restored(
    api: Arc<ScriptedStorefrontApi>,
) {
    let store = SessionStore::new(api);
    let grant = |username: &str, role: Role| {
        Settled::Established(SessionGrant::cookie_only(fixture_identity(1, username, role)))
    };
    let first = store.take_ticket();
    let second = store.take_ticket();
    let mut slot = store.inner.credentials.lock().await;

    let committed = store.settle(second, Ok(grant("seller1", Role::Seller)), &mut slot);
    let stale = store.settle(first, Ok(grant("admin", Role::Admin)), &mut slot);
    let third = store.take_ticket();
    let failed = store.settle(
        third,
        Err(SessionError::from(StorefrontApiError::unauthorized(
            "Invalid username or password",
        ))),
        &mut slot,
    );

    assert!(matches!(committed, Ok(Some(_))));
    assert_eq!(stale, Err(SessionError::Superseded));
    assert!(failed.is_err());
    assert_eq!(
        store.snapshot().identity().map(Identity::username),
        Some("seller1")
    );
}

#[rstest]
#[tokio::test]
async fn register_signs_in_as_new_account(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    let registration =
        Registration::try_new("newseller", "pw", Role::Seller, "new@shop.test", "New Seller")
            .expect("valid registration");

    let identity = store.register(&registration).await.expect("registered");

    assert_eq!(identity.role(), Role::Seller);
    assert!(store.capabilities().is_seller);
}

#[rstest]
#[tokio::test]
async fn duplicate_registration_reports_server_text(api: Arc<ScriptedStorefrontApi>) {
    let store = SessionStore::new(api);
    let registration =
        Registration::try_new("admin", "pw", Role::Customer, "a@shop.test", "Admin Again")
            .expect("valid registration");

    let err = store.register(&registration).await.expect_err("taken");

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(crate::domain::Locale::Fr), "Username already exists");
    assert_eq!(store.snapshot().state(), &SessionState::Unresolved);
}

#[tokio::test]
async fn fetch_presents_login_token() {
    let mut api = MockStorefrontApi::new();
    let identity = fixture_identity(9, "mock", Role::Customer);
    let grant = SessionGrant {
        identity: identity.clone(),
        token: SessionToken::new("abc"),
    };
    api.expect_login().times(1).returning(move |_| Ok(grant.clone()));
    api.expect_current_user()
        .withf(|token| token.as_ref().map(SessionToken::expose) == Some("abc"))
        .times(1)
        .returning(move |_| Ok(identity.clone()));
    let store = SessionStore::new(Arc::new(api));

    store
        .login(&credentials("mock", "pw"))
        .await
        .expect("login succeeds");
    let session = store.fetch_current_identity().await;

    assert!(session.is_authenticated());
}

#[tokio::test]
async fn send_passes_requests_through_the_interceptor() {
    let mut api = MockStorefrontApi::new();
    api.expect_send()
        .withf(|request, token| request.path == "/api/orders" && token.is_none())
        .times(1)
        .returning(|_, _| Err(StorefrontApiError::validation(400_u16, "Cart is empty")));
    let store = SessionStore::new(Arc::new(api));

    let err = store
        .send(&ApiRequest::post(endpoints::ORDERS, json!({"items": []})))
        .await
        .expect_err("validation failure");

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.snapshot().state(), &SessionState::Unresolved);
}

#[tokio::test]
async fn expire_ignores_stale_generations() {
    let mut api = MockStorefrontApi::new();
    let identity = fixture_identity(1, "admin", Role::Admin);
    api.expect_login()
        .returning(move |_| Ok(SessionGrant::cookie_only(identity.clone())));
    api.expect_forget_session().times(1).return_const(());
    let store = SessionStore::new(Arc::new(api));
    store
        .login(&credentials("admin", "admin123"))
        .await
        .expect("login succeeds");

    assert!(!store.expire(0));
    assert!(store.snapshot().is_authenticated());
    assert!(store.expire(1));
    assert!(!store.expire(1));
}
