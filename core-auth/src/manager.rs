//! # Token Lifecycle Manager
//!
//! Answers "is the user signed in?" and keeps the stored credential usable.
//!
//! ## Overview
//!
//! - An unexpired credential is accepted without any network activity
//! - An expired credential (expiry instant inclusive) is refreshed inline
//! - A failed refresh signs the user out completely
//!
//! Refreshes are single-flight: callers that observed the same expired
//! credential queue on one gate, and every caller after the first finds the
//! credential already replaced and returns without a second grant.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{CredentialVault, OAuthConfig, TokenLifecycleManager};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::{http::HttpClient, storage::SecureStore, time::SystemClock};
//! # async fn example(
//! #     config: OAuthConfig,
//! #     http_client: Arc<dyn HttpClient>,
//! #     secure_store: Arc<dyn SecureStore>,
//! # ) -> core_auth::Result<()> {
//! let manager = TokenLifecycleManager::new(
//!     config,
//!     http_client,
//!     Arc::new(CredentialVault::new(secure_store)),
//!     EventBus::new(16),
//!     Arc::new(SystemClock),
//! )?;
//!
//! if manager.is_authenticated().await? {
//!     let token = manager.valid_access_token().await?;
//!     # let _ = token;
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, TokenEndpoint};
use crate::types::{expiry_from, Credential, RefreshedToken};
use crate::vault::CredentialVault;
use bridge_traits::http::HttpClient;
use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub struct TokenLifecycleManager {
    endpoint: TokenEndpoint,
    vault: Arc<CredentialVault>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    /// Serializes refresh grants
    refresh_gate: Mutex<()>,
}

impl TokenLifecycleManager {
    pub fn new(
        config: OAuthConfig,
        http_client: Arc<dyn HttpClient>,
        vault: Arc<CredentialVault>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            endpoint: TokenEndpoint::new(config, http_client),
            vault,
            event_bus,
            clock,
            refresh_gate: Mutex::new(()),
        })
    }

    /// Whether a usable credential is stored.
    ///
    /// Refreshes an expired credential first. If that refresh fails the vault
    /// is cleared and `false` is returned; only storage failures surface as
    /// errors.
    #[instrument(skip(self))]
    pub async fn is_authenticated(&self) -> Result<bool> {
        let Some(credential) = self.vault.load_credential().await? else {
            debug!("No credential stored");
            return Ok(false);
        };

        if !credential.is_expired_at(self.clock.unix_timestamp_millis()) {
            return Ok(true);
        }

        info!("Access token expired; refreshing");
        match self.refresh_observed(&credential).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "Refresh failed; signing out");
                self.logout().await?;
                Ok(false)
            }
        }
    }

    /// Perform a refresh-token grant for the stored credential.
    ///
    /// Replaces the access token and expiry, and the refresh token only when
    /// the provider returns a new one. Not retried.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let _gate = self.refresh_gate.lock().await;

        let credential = self
            .vault
            .load_credential()
            .await?
            .ok_or_else(|| AuthError::RefreshFailed {
                status: None,
                message: "no refresh token stored".to_string(),
            })?;

        self.refresh_locked(&credential).await
    }

    /// Refresh `observed` unless another caller already replaced it.
    async fn refresh_observed(&self, observed: &Credential) -> Result<()> {
        let _gate = self.refresh_gate.lock().await;

        let Some(current) = self.vault.load_credential().await? else {
            return Err(AuthError::Unauthenticated);
        };

        if current.access_token != observed.access_token
            || !current.is_expired_at(self.clock.unix_timestamp_millis())
        {
            debug!("Credential refreshed by a concurrent caller");
            return Ok(());
        }

        self.refresh_locked(&current).await
    }

    async fn refresh_locked(&self, credential: &Credential) -> Result<()> {
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing));

        let tokens = match self.endpoint.refresh(&credential.refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: false,
                }));
                return Err(e);
            }
        };

        let refreshed = RefreshedToken {
            access_token: tokens.access_token,
            expires_at_ms: expiry_from(tokens.expires_in, self.clock.unix_timestamp_millis()),
            refresh_token: tokens.refresh_token,
        };
        self.vault.apply_refresh(&refreshed).await?;

        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                expires_at_ms: refreshed.expires_at_ms,
            }));

        info!(expires_at_ms = refreshed.expires_at_ms, "Token refreshed");
        Ok(())
    }

    /// Delete every stored field. Safe to call when already signed out.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.vault.clear().await?;
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        info!("Signed out");
        Ok(())
    }

    /// The stored access token, without checking expiry.
    pub async fn access_token(&self) -> Result<Option<String>> {
        self.vault.access_token().await
    }

    /// Access token that is valid right now, refreshing first if needed.
    pub async fn valid_access_token(&self) -> Result<String> {
        if !self.is_authenticated().await? {
            return Err(AuthError::Unauthenticated);
        }
        self.vault
            .access_token()
            .await?
            .ok_or(AuthError::Unauthenticated)
    }
}
