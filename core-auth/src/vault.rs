//! Credential Vault
//!
//! Typed access to the four secrets the auth subsystem persists through the
//! host [`SecureStore`]. Multi-key operations run under one async mutex and
//! are ordered so an interrupted write never leaves a record that reads as
//! authenticated:
//!
//! - writes store the expiry and refresh token first and the access token last
//! - deletes remove the access token first
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{Credential, CredentialVault};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let vault = CredentialVault::new(secure_store);
//!
//! vault
//!     .store_credential(&Credential::issued("a".into(), "r".into(), 3600, 0))
//!     .await?;
//! assert!(vault.load_credential().await?.is_some());
//!
//! vault.clear().await?;
//! assert!(vault.load_credential().await?.is_none());
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{Credential, RefreshedToken, VaultKey};
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct CredentialVault {
    store: Arc<dyn SecureStore>,
    write_lock: Mutex<()>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self, key: VaultKey) -> Result<Option<String>> {
        let bytes = self.store.get_secret(key.as_str()).await.map_err(|e| {
            warn!(key = %key, error = %e, "Failed to read from secure store");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        match bytes {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|_| {
                warn!(key = %key, "Stored value is not valid UTF-8");
                AuthError::SecureStorageUnavailable(format!("{} is corrupted", key))
            }),
            None => Ok(None),
        }
    }

    async fn write(&self, key: VaultKey, value: &str) -> Result<()> {
        self.store
            .set_secret(key.as_str(), value.as_bytes())
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Failed to write to secure store");
                AuthError::SecureStorageUnavailable(e.to_string())
            })
    }

    async fn delete(&self, key: VaultKey) -> Result<()> {
        self.store.delete_secret(key.as_str()).await.map_err(|e| {
            warn!(key = %key, error = %e, "Failed to delete from secure store");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }

    /// Read the stored credential.
    ///
    /// Returns `None` unless both tokens are present. A missing or unparsable
    /// expiry yields a credential that is already expired, so the next check
    /// refreshes it.
    pub async fn load_credential(&self) -> Result<Option<Credential>> {
        let access_token = self.read(VaultKey::AccessToken).await?;
        let refresh_token = self.read(VaultKey::RefreshToken).await?;

        let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) else {
            return Ok(None);
        };

        let expires_at_ms = match self.read(VaultKey::TokenExpiry).await? {
            Some(raw) => raw.trim().parse::<i64>().unwrap_or_else(|_| {
                warn!("Stored token expiry is not a number; treating as expired");
                i64::MIN
            }),
            None => {
                debug!("No token expiry stored; treating as expired");
                i64::MIN
            }
        };

        Ok(Some(Credential {
            access_token,
            refresh_token,
            expires_at_ms,
        }))
    }

    /// Persist a freshly issued credential.
    pub async fn store_credential(&self, credential: &Credential) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.write(VaultKey::TokenExpiry, &credential.expires_at_ms.to_string())
            .await?;
        self.write(VaultKey::RefreshToken, &credential.refresh_token)
            .await?;
        self.write(VaultKey::AccessToken, &credential.access_token)
            .await?;

        debug!(expires_at_ms = credential.expires_at_ms, "Stored credential");
        Ok(())
    }

    /// Apply a refresh result: replace the access token and expiry, and the
    /// refresh token only when the provider rotated it.
    pub async fn apply_refresh(&self, refreshed: &RefreshedToken) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.write(VaultKey::TokenExpiry, &refreshed.expires_at_ms.to_string())
            .await?;
        if let Some(refresh_token) = &refreshed.refresh_token {
            self.write(VaultKey::RefreshToken, refresh_token).await?;
        }
        self.write(VaultKey::AccessToken, &refreshed.access_token)
            .await?;

        debug!(
            expires_at_ms = refreshed.expires_at_ms,
            rotated = refreshed.refresh_token.is_some(),
            "Applied refreshed token"
        );
        Ok(())
    }

    /// Remove every field. Deleting absent fields is not an error.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        for key in VaultKey::ALL {
            self.delete(key).await?;
        }

        debug!("Cleared credential vault");
        Ok(())
    }

    pub async fn store_verifier(&self, verifier: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(VaultKey::CodeVerifier, verifier).await
    }

    pub async fn load_verifier(&self) -> Result<Option<String>> {
        self.read(VaultKey::CodeVerifier).await
    }

    pub async fn delete_verifier(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.delete(VaultKey::CodeVerifier).await
    }

    /// Stored access token without any expiry check.
    pub async fn access_token(&self) -> Result<Option<String>> {
        self.read(VaultKey::AccessToken).await
    }
}
