//! Integration tests for the login flow and token lifecycle
//!
//! These tests drive the public API end to end against stub bridges:
//! - Expiry at exactly "now" triggers one refresh
//! - Concurrent checks of an expired credential share one refresh
//! - Logout is idempotent
//! - A callback after the login timeout mutates nothing
//! - A second login supersedes the first, even mid-exchange
//! - Cancelling mid-exchange discards the exchanged tokens

use async_trait::async_trait;
use bridge_desktop::InMemorySecureStore;
use bridge_traits::{
    error::Result as BridgeResult, storage::SecureStore, time::FixedClock, HttpClient,
    HttpRequest, HttpResponse,
};
use bytes::Bytes;
use core_auth::{
    AuthError, CallbackOutcome, Credential, CredentialVault, FlowState, OAuthConfig, OAuthFlowController,
    TokenLifecycleManager,
};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const NOW: i64 = 1_700_000_000_000;
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Stub Implementations
// ============================================================================

/// Token endpoint stub that answers every request with the same body and
/// records the form bodies it received.
struct StubTokenEndpoint {
    status: u16,
    body: String,
    delay: Duration,
    calls: AtomicUsize,
    forms: Mutex<Vec<HashMap<String, String>>>,
}

impl StubTokenEndpoint {
    fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            forms: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_form(&self) -> HashMap<String, String> {
        self.forms.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl HttpClient for StubTokenEndpoint {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request.body.unwrap_or_default();
        let form: HashMap<String, String> = serde_urlencoded::from_bytes(&body).unwrap_or_default();
        self.forms.lock().unwrap().push(form);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(HttpResponse {
            status: self.status,
            headers: HashMap::new(),
            body: Bytes::from(self.body.clone()),
        })
    }
}

struct Harness {
    store: Arc<InMemorySecureStore>,
    vault: Arc<CredentialVault>,
    http: Arc<StubTokenEndpoint>,
    event_bus: EventBus,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn new(http: StubTokenEndpoint) -> Self {
        let store = Arc::new(InMemorySecureStore::new());
        Self {
            vault: Arc::new(CredentialVault::new(store.clone())),
            store,
            http: Arc::new(http),
            event_bus: EventBus::new(64),
            clock: Arc::new(FixedClock::at_millis(NOW)),
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig {
            provider: "Test".to_string(),
            client_id: "client".to_string(),
            redirect_uri: "app://callback".to_string(),
            scopes: vec!["read".to_string()],
            auth_url: "https://provider.test/authorize".to_string(),
            token_url: "https://provider.test/token".to_string(),
        }
    }

    fn manager(&self) -> TokenLifecycleManager {
        TokenLifecycleManager::new(
            Self::config(),
            self.http.clone(),
            self.vault.clone(),
            self.event_bus.clone(),
            self.clock.clone(),
        )
        .unwrap()
    }

    fn flow(&self) -> OAuthFlowController {
        OAuthFlowController::new(
            Self::config(),
            self.http.clone(),
            self.vault.clone(),
            self.event_bus.clone(),
            self.clock.clone(),
            CALLBACK_TIMEOUT,
        )
        .unwrap()
    }

    async fn seed(&self, expires_at_ms: i64) {
        self.vault
            .store_credential(&Credential {
                access_token: "old-access".to_string(),
                refresh_token: "old-refresh".to_string(),
                expires_at_ms,
            })
            .await
            .unwrap();
    }
}

const TOKEN_BODY: &str = r#"{"access_token":"new-access","refresh_token":"new-refresh","expires_in":3600}"#;

// ============================================================================
// Token lifecycle
// ============================================================================

#[tokio::test]
async fn test_expiry_equal_to_now_refreshes_once() {
    let harness = Harness::new(StubTokenEndpoint::ok(TOKEN_BODY));
    harness.seed(NOW).await;
    let manager = harness.manager();

    assert!(manager.is_authenticated().await.unwrap());
    assert_eq!(harness.http.calls(), 1);
    assert_eq!(harness.http.last_form()["grant_type"], "refresh_token");

    // The refreshed credential is valid for another hour.
    assert!(manager.is_authenticated().await.unwrap());
    assert_eq!(harness.http.calls(), 1);
    assert_eq!(
        manager.valid_access_token().await.unwrap(),
        "new-access".to_string()
    );
}

#[tokio::test]
async fn test_concurrent_checks_share_one_refresh() {
    let harness = Harness::new(
        StubTokenEndpoint::ok(TOKEN_BODY).with_delay(Duration::from_millis(20)),
    );
    harness.seed(NOW - 1).await;
    let manager = harness.manager();

    let (first, second, third) = tokio::join!(
        manager.is_authenticated(),
        manager.is_authenticated(),
        manager.is_authenticated()
    );

    assert!(first.unwrap() && second.unwrap() && third.unwrap());
    assert_eq!(harness.http.calls(), 1);
}

#[tokio::test]
async fn test_logout_twice_leaves_empty_vault() {
    let harness = Harness::new(StubTokenEndpoint::ok(TOKEN_BODY));
    harness.seed(NOW + 60_000).await;
    harness.vault.store_verifier("pending").await.unwrap();
    let manager = harness.manager();

    manager.logout().await.unwrap();
    manager.logout().await.unwrap();

    assert!(harness.store.is_empty().await);
    for key in ["ACCESS_TOKEN", "REFRESH_TOKEN", "TOKEN_EXPIRY", "CODE_VERIFIER"] {
        assert!(!harness.store.has_secret(key).await.unwrap(), "{key} left behind");
    }
    assert!(!manager.is_authenticated().await.unwrap());
    assert_eq!(harness.http.calls(), 0);
}

// ============================================================================
// Login flow
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_callback_after_timeout_is_ignored() {
    let harness = Harness::new(StubTokenEndpoint::ok(TOKEN_BODY));
    let flow = harness.flow();
    let mut events = harness.event_bus.subscribe();

    flow.begin_login().await.unwrap();
    assert!(harness.store.has_secret("CODE_VERIFIER").await.unwrap());

    // Paused time auto-advances to the listener deadline while we wait.
    loop {
        match events.recv().await.unwrap() {
            CoreEvent::Auth(AuthEvent::LoginTimedOut) => break,
            _ => continue,
        }
    }

    assert_eq!(flow.state().await, FlowState::Idle);
    assert!(harness.store.is_empty().await);

    let delivered = flow.deliver_callback("app://callback?code=late").await;

    assert!(delivered.is_none());
    assert!(harness.store.is_empty().await);
    assert_eq!(harness.http.calls(), 0);
    assert_eq!(flow.state().await, FlowState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_second_login_supersedes_first() {
    let harness = Harness::new(StubTokenEndpoint::ok(TOKEN_BODY));
    let flow = harness.flow();

    let first = flow.begin_login().await.unwrap();
    let first_verifier = harness.vault.load_verifier().await.unwrap().unwrap();

    tokio::time::advance(Duration::from_secs(120)).await;

    let second = flow.begin_login().await.unwrap();
    let second_verifier = harness.vault.load_verifier().await.unwrap().unwrap();
    assert_ne!(first.attempt_id, second.attempt_id);
    assert_ne!(first_verifier, second_verifier);

    // Past the first attempt's deadline but not the second's.
    tokio::time::advance(Duration::from_secs(200)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert_eq!(flow.state().await, FlowState::AwaitingCallback);
    assert_eq!(
        flow.pending().await.map(|p| p.attempt_id),
        Some(second.attempt_id)
    );

    let outcome = flow
        .deliver_callback("app://callback?code=fresh&state=x")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome, CallbackOutcome::Authenticated);
    assert_eq!(harness.http.calls(), 1);
    let form = harness.http.last_form();
    assert_eq!(form["code"], "fresh");
    assert_eq!(form["code_verifier"], second_verifier);
    assert_eq!(flow.state().await, FlowState::Authenticated);
    assert!(harness.vault.load_verifier().await.unwrap().is_none());
}

/// Start a callback delivery and return once its token request is on the wire.
async fn deliver_in_background(
    harness: &Harness,
    flow: &OAuthFlowController,
    uri: &'static str,
) -> tokio::task::JoinHandle<Option<core_auth::Result<CallbackOutcome>>> {
    let calls_before = harness.http.calls();
    let flow = flow.clone();
    let delivery = tokio::spawn(async move { flow.deliver_callback(uri).await });
    while harness.http.calls() == calls_before {
        tokio::task::yield_now().await;
    }
    delivery
}

#[tokio::test(start_paused = true)]
async fn test_login_started_during_exchange_wins() {
    let harness = Harness::new(
        StubTokenEndpoint::ok(TOKEN_BODY).with_delay(Duration::from_secs(2)),
    );
    let flow = harness.flow();
    let mut events = harness.event_bus.subscribe();

    flow.begin_login().await.unwrap();
    let in_flight = deliver_in_background(&harness, &flow, "app://callback?code=one").await;
    assert_eq!(flow.state().await, FlowState::Exchanging);

    let second = flow.begin_login().await.unwrap();
    let second_verifier = harness.vault.load_verifier().await.unwrap().unwrap();

    let first = in_flight.await.unwrap().unwrap();

    assert!(matches!(first, Err(AuthError::AttemptAbandoned)));
    assert_eq!(flow.state().await, FlowState::AwaitingCallback);
    assert_eq!(
        harness.vault.load_verifier().await.unwrap(),
        Some(second_verifier.clone())
    );
    assert!(harness.vault.load_credential().await.unwrap().is_none());
    assert_eq!(
        flow.pending().await.map(|p| p.attempt_id),
        Some(second.attempt_id)
    );
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(
                event,
                CoreEvent::Auth(AuthEvent::SignedIn) | CoreEvent::Auth(AuthEvent::AuthError { .. })
            ),
            "abandoned attempt published {event:?}"
        );
    }

    let outcome = flow
        .deliver_callback("app://callback?code=two")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome, CallbackOutcome::Authenticated);
    assert_eq!(harness.http.calls(), 2);
    let form = harness.http.last_form();
    assert_eq!(form["code"], "two");
    assert_eq!(form["code_verifier"], second_verifier);
    assert_eq!(flow.state().await, FlowState::Authenticated);
    assert!(harness.vault.load_verifier().await.unwrap().is_none());
    assert!(harness.vault.load_credential().await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_exchange_discards_tokens() {
    let harness = Harness::new(
        StubTokenEndpoint::ok(TOKEN_BODY).with_delay(Duration::from_secs(2)),
    );
    let flow = harness.flow();

    flow.begin_login().await.unwrap();
    let in_flight = deliver_in_background(&harness, &flow, "app://callback?code=one").await;

    assert!(flow.cancel_login().await.unwrap());
    let result = in_flight.await.unwrap().unwrap();

    assert!(matches!(result, Err(AuthError::AttemptAbandoned)));
    assert_eq!(flow.state().await, FlowState::Idle);
    assert!(harness.store.is_empty().await);
    assert!(!flow.cancel_login().await.unwrap());
}

#[tokio::test]
async fn test_login_then_lifecycle_check() {
    let harness = Harness::new(StubTokenEndpoint::ok(TOKEN_BODY));
    let flow = harness.flow();
    let manager = harness.manager();

    assert!(!manager.is_authenticated().await.unwrap());

    flow.begin_login().await.unwrap();
    flow.deliver_callback("app://callback?code=abc")
        .await
        .unwrap()
        .unwrap();

    assert!(manager.is_authenticated().await.unwrap());
    assert_eq!(harness.http.calls(), 1);

    let credential = harness.vault.load_credential().await.unwrap().unwrap();
    assert_eq!(credential.expires_at_ms, NOW + 3_600_000);
}
