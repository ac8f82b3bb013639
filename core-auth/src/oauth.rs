//! OAuth 2.0 Authorization Code Flow with PKCE
//!
//! Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for a public client:
//! no client secret, the verifier proves possession during the exchange.
//!
//! # Overview
//!
//! - [`OAuthConfig`] describes the provider endpoints and the registered client.
//! - [`TokenEndpoint`] builds authorization URLs and performs the
//!   authorization-code and refresh-token grants.
//! - [`OAuthFlowController`] drives one login attempt at a time: it stores the
//!   PKCE verifier, installs a one-shot callback listener and exchanges the
//!   code delivered by the host's redirect handler.
//!
//! # Security
//!
//! - The verifier is kept in the secure store, never in memory beyond one call
//! - Only the S256 challenge is sent with the authorization request
//! - Tokens, codes and verifiers are never logged
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowController};
//! use core_auth::CredentialVault;
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! use std::time::Duration;
//! # use bridge_traits::{http::HttpClient, storage::SecureStore, time::SystemClock};
//! # async fn example(
//! #     http_client: Arc<dyn HttpClient>,
//! #     secure_store: Arc<dyn SecureStore>,
//! # ) -> core_auth::Result<()> {
//! let config = OAuthConfig {
//!     provider: "Spotify".to_string(),
//!     client_id: "your-client-id".to_string(),
//!     redirect_uri: "myapp://callback".to_string(),
//!     scopes: vec!["user-read-currently-playing".to_string()],
//!     auth_url: "https://accounts.spotify.com/authorize".to_string(),
//!     token_url: "https://accounts.spotify.com/api/token".to_string(),
//! };
//!
//! let flow = OAuthFlowController::new(
//!     config,
//!     http_client,
//!     Arc::new(CredentialVault::new(secure_store)),
//!     EventBus::new(16),
//!     Arc::new(SystemClock),
//!     Duration::from_secs(300),
//! )?;
//!
//! let authorization = flow.begin_login().await?;
//! // Open authorization.url in a browser, then route the redirect back:
//! flow.deliver_callback("myapp://callback?code=abc&state=xyz").await;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::listener::{self, ListenerHandle};
use crate::pkce::{derive_challenge, generate_state, generate_verifier};
use crate::types::{AuthorizationUrl, CallbackOutcome, Credential, FlowState, PendingAuthorization};
use crate::vault::CredentialVault;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// OAuth 2.0 provider configuration for a public (secretless) client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Human-readable provider name, used in logs only
    pub provider: String,
    /// OAuth client ID
    pub client_id: String,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
    /// Scopes to request, joined with spaces in the authorization URL
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Check that every field needed by the flow is usable.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::InvalidConfig("client_id is empty".to_string()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::InvalidConfig(
                "redirect_uri is empty".to_string(),
            ));
        }
        for (name, value) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            Url::parse(value)
                .map_err(|e| AuthError::InvalidConfig(format!("invalid {}: {}", name, e)))?;
        }
        Ok(())
    }
}

/// Token response from the provider's token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Extract the authorization code from a redirect URI.
///
/// Takes the text after the first `code=` up to the next `&` or the end of
/// the string. Returns `None` when there is no code or it is empty, which the
/// flow treats as the user cancelling.
///
/// ```
/// use core_auth::oauth::extract_authorization_code;
///
/// assert_eq!(
///     extract_authorization_code("app://cb?code=abc&state=1"),
///     Some("abc")
/// );
/// assert_eq!(extract_authorization_code("app://cb?error=access_denied"), None);
/// ```
pub fn extract_authorization_code(uri: &str) -> Option<&str> {
    let code = uri.split("code=").nth(1)?.split('&').next()?;
    (!code.is_empty()).then_some(code)
}

/// Client for the provider's authorization and token endpoints.
///
/// Grants are single-shot: no request is retried.
pub struct TokenEndpoint {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl TokenEndpoint {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL for the given challenge and state.
    #[instrument(skip(self, challenge, state), fields(provider = %self.config.provider))]
    pub fn authorization_url(&self, challenge: &str, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::InvalidConfig(format!("invalid auth_url: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", challenge)
            .append_pair("state", state);

        debug!("Built authorization URL");
        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens.
    #[instrument(skip(self, code, verifier), fields(provider = %self.config.provider))]
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self.post_form(&form).await.map_err(|e| AuthError::ExchangeFailed {
            status: None,
            message: e,
        })?;

        if !response.is_success() {
            let message = describe_error_body(&response);
            warn!(
                status = response.status,
                error = %message,
                "Token endpoint rejected authorization code"
            );
            return Err(AuthError::ExchangeFailed {
                status: Some(response.status),
                message,
            });
        }

        let tokens: TokenResponse = response.json().map_err(|e| AuthError::ExchangeFailed {
            status: Some(response.status),
            message: format!("invalid token response: {}", e),
        })?;

        info!(
            expires_in = tokens.expires_in,
            "Exchanged authorization code for tokens"
        );
        Ok(tokens)
    }

    /// Perform a refresh-token grant.
    #[instrument(skip(self, refresh_token), fields(provider = %self.config.provider))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        debug!("Refreshing access token");

        let response = self.post_form(&form).await.map_err(|e| AuthError::RefreshFailed {
            status: None,
            message: e,
        })?;

        if !response.is_success() {
            let message = describe_error_body(&response);
            warn!(
                status = response.status,
                error = %message,
                "Token endpoint rejected refresh token"
            );
            return Err(AuthError::RefreshFailed {
                status: Some(response.status),
                message,
            });
        }

        let tokens: TokenResponse = response.json().map_err(|e| AuthError::RefreshFailed {
            status: Some(response.status),
            message: format!("invalid token response: {}", e),
        })?;

        info!(expires_in = tokens.expires_in, "Refreshed access token");
        Ok(tokens)
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> std::result::Result<HttpResponse, String> {
        let encoded = serde_urlencoded::to_string(form)
            .map_err(|e| format!("failed to encode token request: {}", e))?;

        let request =
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form_body(encoded);

        self.http_client
            .execute(request)
            .await
            .map_err(|e| e.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Human-readable reason from an OAuth error response.
fn describe_error_body(response: &HttpResponse) -> String {
    if let Ok(body) = response.json::<ErrorBody>() {
        if let Some(reason) = body.error_description.or(body.error) {
            return reason;
        }
    }
    response
        .text()
        .ok()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}

/// Login attempt bookkeeping, guarded by one lock.
#[derive(Default)]
struct AttemptSlot {
    /// Attempt allowed to commit a callback result; stays set while its
    /// exchange is in flight
    owner: Option<Uuid>,
    /// Listener still waiting for the redirect
    listener: Option<ListenerHandle>,
}

struct FlowInner {
    endpoint: TokenEndpoint,
    vault: Arc<CredentialVault>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    callback_timeout: Duration,
    state: RwLock<FlowState>,
    attempt: Mutex<AttemptSlot>,
}

/// Drives the PKCE login flow.
///
/// Cheap to clone; clones share the same attempt and state.
///
/// # Concurrency
///
/// At most one login attempt is outstanding. Starting a new one cancels the
/// previous attempt's listener and replaces its verifier. An attempt whose
/// code exchange is already running when it is superseded or cancelled
/// finishes with [`AuthError::AttemptAbandoned`] and leaves the vault, the
/// flow state and the event bus untouched.
#[derive(Clone)]
pub struct OAuthFlowController {
    inner: Arc<FlowInner>,
}

impl OAuthFlowController {
    pub fn new(
        config: OAuthConfig,
        http_client: Arc<dyn HttpClient>,
        vault: Arc<CredentialVault>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        callback_timeout: Duration,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(FlowInner {
                endpoint: TokenEndpoint::new(config, http_client),
                vault,
                event_bus,
                clock,
                callback_timeout,
                state: RwLock::new(FlowState::Idle),
                attempt: Mutex::new(AttemptSlot::default()),
            }),
        })
    }

    pub fn config(&self) -> &OAuthConfig {
        self.inner.endpoint.config()
    }

    /// Current flow state.
    pub async fn state(&self) -> FlowState {
        *self.inner.state.read().await
    }

    /// The login attempt still waiting for its redirect, if any.
    pub async fn pending(&self) -> Option<PendingAuthorization> {
        self.inner
            .attempt
            .lock()
            .await
            .listener
            .as_ref()
            .map(|handle| handle.pending().clone())
    }

    async fn set_state(&self, state: FlowState) {
        let mut current = self.inner.state.write().await;
        if *current != state {
            debug!(from = %*current, to = %state, "Login flow state changed");
            *current = state;
        }
    }

    /// Lock the attempt slot, failing if `attempt_id` no longer owns it.
    async fn owned_slot(&self, attempt_id: Option<Uuid>) -> Result<MutexGuard<'_, AttemptSlot>> {
        let slot = self.inner.attempt.lock().await;
        if slot.owner != attempt_id {
            return Err(AuthError::AttemptAbandoned);
        }
        Ok(slot)
    }

    /// Start a login attempt.
    ///
    /// Stores a fresh verifier, installs the callback listener and returns the
    /// URL the host should open. Accepted from every state; an outstanding
    /// attempt is superseded, including one whose exchange is in flight.
    #[instrument(skip(self), fields(provider = %self.config().provider))]
    pub async fn begin_login(&self) -> Result<AuthorizationUrl> {
        let verifier = generate_verifier();
        let challenge = derive_challenge(&verifier);
        let url = self
            .inner
            .endpoint
            .authorization_url(&challenge, &generate_state())?;

        let pending = PendingAuthorization {
            attempt_id: Uuid::new_v4(),
            created_at_ms: self.inner.clock.unix_timestamp_millis(),
        };

        let mut slot = self.inner.attempt.lock().await;

        if let Some(stale) = slot.listener.take() {
            info!(attempt_id = %stale.attempt_id(), "Superseding outstanding login attempt");
            stale.cancel();
        } else if let Some(stale_id) = slot.owner {
            info!(attempt_id = %stale_id, "Superseding login attempt with exchange in flight");
        }
        slot.owner = None;

        if let Err(e) = self.inner.vault.store_verifier(&verifier).await {
            self.set_state(FlowState::Idle).await;
            return Err(e);
        }

        slot.owner = Some(pending.attempt_id);
        slot.listener = Some(listener::spawn(
            self.clone(),
            pending.clone(),
            self.inner.callback_timeout,
        ));
        self.set_state(FlowState::AwaitingCallback).await;
        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SigningIn));
        drop(slot);

        info!(
            attempt_id = %pending.attempt_id,
            timeout_secs = self.inner.callback_timeout.as_secs(),
            "Login started; awaiting redirect callback"
        );

        Ok(AuthorizationUrl {
            url,
            attempt_id: pending.attempt_id,
        })
    }

    /// Route a redirect URI from the host to the active listener.
    ///
    /// Returns `None` when no attempt is outstanding (never started, already
    /// consumed, cancelled or timed out); nothing is mutated in that case.
    #[instrument(skip(self, uri))]
    pub async fn deliver_callback(&self, uri: &str) -> Option<Result<CallbackOutcome>> {
        let handle = self.inner.attempt.lock().await.listener.take();
        let Some(handle) = handle else {
            debug!("No login attempt outstanding; ignoring callback");
            return None;
        };

        handle.deliver(uri.to_string())?.await.ok()
    }

    /// Process a redirect URI for the current attempt, bypassing its listener.
    ///
    /// A URI without an authorization code means the user declined or closed
    /// the page: the flow returns to `Idle` with no other effect.
    pub async fn handle_callback(&self, uri: &str) -> Result<CallbackOutcome> {
        let attempt_id = {
            let mut slot = self.inner.attempt.lock().await;
            if let Some(handle) = slot.listener.take() {
                handle.cancel();
            }
            slot.owner
        };
        self.process_callback(attempt_id, uri).await
    }

    /// Process a redirect URI on behalf of `attempt_id`.
    #[instrument(skip(self, uri), fields(provider = %self.config().provider))]
    pub(crate) async fn process_callback(
        &self,
        attempt_id: Option<Uuid>,
        uri: &str,
    ) -> Result<CallbackOutcome> {
        let Some(code) = extract_authorization_code(uri) else {
            info!("Callback carried no authorization code; login cancelled");
            let mut slot = self.inner.attempt.lock().await;
            if slot.owner == attempt_id {
                slot.owner = None;
                self.set_state(FlowState::Idle).await;
            }
            return Ok(CallbackOutcome::Cancelled);
        };

        match self.exchange_and_store(attempt_id, code).await {
            Ok(credential) => {
                info!(expires_at_ms = credential.expires_at_ms, "Login completed");
                Ok(CallbackOutcome::Authenticated)
            }
            Err(e) => {
                let mut slot = self.inner.attempt.lock().await;
                if slot.owner != attempt_id {
                    info!(error = %e, "Discarding result of abandoned login attempt");
                    return Err(e);
                }
                warn!(error = %e, "Login failed");
                slot.owner = None;
                self.set_state(FlowState::Failed).await;
                let _ = self
                    .inner
                    .event_bus
                    .emit(CoreEvent::Auth(AuthEvent::AuthError {
                        message: e.to_string(),
                        recoverable: true,
                    }));
                Err(e)
            }
        }
    }

    async fn exchange_and_store(&self, attempt_id: Option<Uuid>, code: &str) -> Result<Credential> {
        let verifier = {
            let _slot = self.owned_slot(attempt_id).await?;
            self.set_state(FlowState::Exchanging).await;
            self.inner
                .vault
                .load_verifier()
                .await?
                .ok_or(AuthError::MissingVerifier)?
        };

        let tokens = self.inner.endpoint.exchange_code(code, &verifier).await?;
        let refresh_token = tokens.refresh_token.ok_or_else(|| AuthError::ExchangeFailed {
            status: None,
            message: "token response carried no refresh_token".to_string(),
        })?;

        let credential = Credential::issued(
            tokens.access_token,
            refresh_token,
            tokens.expires_in,
            self.inner.clock.unix_timestamp_millis(),
        );

        let mut slot = self.owned_slot(attempt_id).await?;
        self.inner.vault.store_credential(&credential).await?;

        if let Err(e) = self.inner.vault.delete_verifier().await {
            warn!(error = %e, "Failed to delete code verifier after exchange");
        }
        slot.owner = None;
        self.set_state(FlowState::Authenticated).await;
        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedIn));

        Ok(credential)
    }

    /// Abandon the outstanding login attempt, whether it is still waiting
    /// for the redirect or already exchanging its code.
    ///
    /// Returns `false` when there was none.
    #[instrument(skip(self))]
    pub async fn cancel_login(&self) -> Result<bool> {
        let mut slot = self.inner.attempt.lock().await;
        let Some(attempt_id) = slot.owner.take() else {
            return Ok(false);
        };
        if let Some(handle) = slot.listener.take() {
            handle.cancel();
        }

        info!(%attempt_id, "Login cancelled by host");
        self.inner.vault.delete_verifier().await?;
        self.set_state(FlowState::Idle).await;
        Ok(true)
    }

    /// Called by the listener when its deadline passes.
    ///
    /// Returns `false` if `attempt_id` no longer owns the listener, in which
    /// case nothing is touched.
    pub(crate) async fn expire_attempt(&self, attempt_id: Uuid) -> bool {
        let mut slot = self.inner.attempt.lock().await;
        if slot.listener.as_ref().map(ListenerHandle::attempt_id) != Some(attempt_id) {
            return false;
        }
        slot.listener = None;
        slot.owner = None;

        if let Err(e) = self.inner.vault.delete_verifier().await {
            warn!(error = %e, "Failed to delete code verifier after timeout");
        }
        self.set_state(FlowState::Idle).await;
        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::LoginTimedOut));

        info!(%attempt_id, "Login attempt timed out");
        true
    }
}
