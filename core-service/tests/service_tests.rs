//! End-to-end tests for the core service
//!
//! A single routing HTTP stub stands in for the token endpoint, the Spotify
//! Web API and LRCLib, so these tests exercise the real wiring:
//! - Login, redirect, then a track with lyrics
//! - Expired credential is refreshed before calling Spotify
//! - Logout makes the orchestrator report `Unauthenticated`

use async_trait::async_trait;
use bridge_desktop::InMemorySecureStore;
use bridge_traits::{
    error::Result as BridgeResult, time::FixedClock, HttpClient, HttpMethod, HttpRequest,
    HttpResponse,
};
use bytes::Bytes;
use core_auth::{CallbackOutcome, Credential, CredentialVault, FlowState, OAuthConfig};
use core_lyrics::SyncedLyricLine;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent, LyricsEvent};
use core_service::{CoreError, CoreService};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const NOW: i64 = 1_700_000_000_000;
const TOKEN_URL: &str = "https://accounts.test/api/token";

// ============================================================================
// Stub Implementations
// ============================================================================

/// Routes by URL prefix and records `(method, url, authorization)` per request.
#[derive(Default)]
struct RoutingHttpClient {
    requests: Mutex<Vec<(HttpMethod, String, Option<String>)>>,
}

impl RoutingHttpClient {
    fn requests(&self) -> Vec<(HttpMethod, String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }

    fn bearer_tokens(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|(_, url, _)| url.contains("api.spotify.com"))
            .filter_map(|(_, _, auth)| auth)
            .collect()
    }
}

fn respond(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

#[async_trait]
impl HttpClient for RoutingHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push((
            request.method,
            request.url.clone(),
            request.headers.get("Authorization").cloned(),
        ));

        let response = if request.url == TOKEN_URL {
            let body = request.body.unwrap_or_default();
            let form: HashMap<String, String> =
                serde_urlencoded::from_bytes(&body).unwrap_or_default();
            match form.get("grant_type").map(String::as_str) {
                Some("authorization_code") => respond(
                    200,
                    r#"{"access_token":"access-1","refresh_token":"refresh-1","expires_in":3600}"#,
                ),
                Some("refresh_token") => {
                    respond(200, r#"{"access_token":"access-2","expires_in":3600}"#)
                }
                _ => respond(400, r#"{"error":"unsupported_grant_type"}"#),
            }
        } else if request.url.starts_with("https://api.spotify.com/v1/me/player/currently-playing") {
            respond(
                200,
                r#"{"progress_ms":1500,"is_playing":true,"item":{"name":"Song","artists":[{"name":"The Band"}],"album":{"name":"Live"},"duration_ms":180000}}"#,
            )
        } else if request.url.starts_with("https://lrclib.net/api/search") {
            respond(
                200,
                r#"[{"id":3,"trackName":"Song","artistName":"The Band","syncedLyrics":"[00:01.00]first\n[00:02.00]second"}]"#,
            )
        } else {
            respond(404, "")
        };

        Ok(response)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    http: Arc<RoutingHttpClient>,
    store: Arc<InMemorySecureStore>,
    core: CoreService,
}

fn oauth_config() -> OAuthConfig {
    OAuthConfig {
        provider: "spotify".to_string(),
        client_id: "test-client".to_string(),
        redirect_uri: "lyricsapp://callback".to_string(),
        scopes: vec!["user-read-currently-playing".to_string()],
        auth_url: "https://accounts.test/authorize".to_string(),
        token_url: TOKEN_URL.to_string(),
    }
}

fn harness() -> Harness {
    let http = Arc::new(RoutingHttpClient::default());
    let store = Arc::new(InMemorySecureStore::new());

    let config = CoreConfig::builder()
        .http_client(http.clone())
        .secure_store(store.clone())
        .clock(Arc::new(FixedClock::at_millis(NOW)))
        .lyrics_cache_capacity(4)
        .build()
        .unwrap();

    let core = CoreService::new(config, oauth_config()).unwrap();
    Harness { http, store, core }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_login_then_track_with_lyrics() {
    let h = harness();
    let mut events = h.core.subscribe();

    let login = h.core.begin_login().await.unwrap();
    assert!(login.url.starts_with("https://accounts.test/authorize?response_type=code"));
    assert_eq!(h.core.login_state().await, FlowState::AwaitingCallback);

    let outcome = h
        .core
        .handle_redirect("lyricsapp://callback?code=auth-code&state=x")
        .await
        .unwrap();
    assert_eq!(outcome, Some(CallbackOutcome::Authenticated));
    assert!(h.core.is_authenticated().await.unwrap());

    let track = h.core.get_current_track_with_lyrics().await.unwrap();
    assert_eq!(track.track_name, "Song");
    assert_eq!(track.artist_name, "The Band");
    assert_eq!(
        track.lyrics,
        vec![
            SyncedLyricLine::new(1000, "first"),
            SyncedLyricLine::new(2000, "second"),
        ]
    );
    assert_eq!(track.active_line(), Some(0));
    assert_eq!(h.http.bearer_tokens(), vec!["Bearer access-1".to_string()]);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen[0], CoreEvent::Auth(AuthEvent::SigningIn)));
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::Auth(AuthEvent::SignedIn))));
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::Lyrics(LyricsEvent::Resolved { tier: 1, .. }))));
}

#[tokio::test]
async fn test_expired_credential_is_refreshed_before_now_playing() {
    let h = harness();
    let vault = CredentialVault::new(h.store.clone());
    vault
        .store_credential(&Credential {
            access_token: "stale".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at_ms: NOW,
        })
        .await
        .unwrap();

    let track = h.core.get_current_track_with_lyrics().await.unwrap();

    assert_eq!(track.lyrics.len(), 2);
    assert_eq!(h.http.bearer_tokens(), vec!["Bearer access-2".to_string()]);
    let stored = vault.load_credential().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_logout_then_unauthenticated() {
    let h = harness();
    h.core.begin_login().await.unwrap();
    h.core
        .handle_redirect("lyricsapp://callback?code=auth-code")
        .await
        .unwrap();

    h.core.logout().await.unwrap();

    assert!(h.store.is_empty().await);
    assert!(matches!(
        h.core.get_current_track_with_lyrics().await,
        Err(CoreError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_auth_status_stream_reports_sign_in_and_sign_out() {
    let h = harness();
    let mut status = h.core.auth_status_changes();

    h.core.begin_login().await.unwrap();
    h.core
        .handle_redirect("lyricsapp://callback?code=auth-code")
        .await
        .unwrap();
    h.core.get_current_track_with_lyrics().await.unwrap();
    h.core.logout().await.unwrap();

    assert_eq!(
        status.try_recv().unwrap().unwrap(),
        CoreEvent::Auth(AuthEvent::SignedIn)
    );
    assert_eq!(
        status.try_recv().unwrap().unwrap(),
        CoreEvent::Auth(AuthEvent::SignedOut)
    );
    assert!(status.try_recv().is_none());
}

#[tokio::test]
async fn test_redirect_without_login_is_ignored() {
    let h = harness();

    let outcome = h
        .core
        .handle_redirect("lyricsapp://callback?code=unexpected")
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert!(h.http.requests().is_empty());
    assert!(h.store.is_empty().await);
}
