//! # Core Configuration Module
//!
//! The configuration system uses a builder to construct a [`CoreConfig`]
//! holding every bridge and setting the core needs. `build()` validates
//! fail-fast so a host learns about a missing capability at startup rather
//! than on the first login attempt.
//!
//! ## Required Dependencies (with desktop defaults)
//!
//! - `HttpClient` - token endpoint, lyrics index, now-playing API
//! - `SecureStore` - credential persistence
//!
//! With the `desktop-shims` feature enabled, `ReqwestHttpClient` and
//! `KeyringSecureStore` from `bridge-desktop` are injected when not provided.
//!
//! ## Optional Dependencies
//!
//! - `NowPlayingSource` - the service layer falls back to its default connector
//! - `Clock` - defaults to [`SystemClock`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .secure_store(Arc::new(MySecureStore))
//!     .callback_timeout(Duration::from_secs(120))
//!     .lyrics_cache_capacity(64)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, HttpClient, NowPlayingSource, SecureStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// How long the login flow waits for the redirect callback.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Public LRCLib API.
pub const DEFAULT_LYRICS_BASE_URL: &str = "https://lrclib.net/api";

pub const DEFAULT_LYRICS_CACHE_CAPACITY: usize = 128;

/// Settings for the synced-lyrics index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsSettings {
    /// Base URL of the search API, without trailing slash
    pub base_url: String,
    /// Resolved-lyrics LRU capacity; 0 disables caching
    pub cache_capacity: usize,
    /// Sent as `User-Agent`; LRCLib asks clients to identify themselves
    pub user_agent: String,
    /// Per-request timeout for index searches
    pub request_timeout: Duration,
}

impl Default for LyricsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LYRICS_BASE_URL.to_string(),
            cache_capacity: DEFAULT_LYRICS_CACHE_CAPACITY,
            user_agent: concat!("lyrics-core/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl LyricsSettings {
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(Error::Config("Lyrics base URL cannot be empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Lyrics base URL must be http(s): {}",
                base
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Lyrics request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
    pub now_playing: Option<Arc<dyn NowPlayingSource>>,
    pub clock: Arc<dyn Clock>,
    /// Deadline for the OAuth redirect callback
    pub callback_timeout: Duration,
    pub lyrics: LyricsSettings,
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field(
                "now_playing",
                &self.now_playing.as_ref().map(|_| "NowPlayingSource { ... }"),
            )
            .field("callback_timeout", &self.callback_timeout)
            .field("lyrics", &self.lyrics)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates settings that the builder cannot check by type.
    pub fn validate(&self) -> Result<()> {
        if self.callback_timeout.is_zero() {
            return Err(Error::Config(
                "Callback timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        self.lyrics.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for credential persistence. \
                 Desktop: enable the 'desktop-shims' feature to use KeyringSecureStore. \
                 Other hosts: inject platform secure storage (Keychain/Keystore/SecretStorage)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for token and lyrics requests. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    now_playing: Option<Arc<dyn NowPlayingSource>>,
    clock: Option<Arc<dyn Clock>>,
    callback_timeout: Option<Duration>,
    lyrics: LyricsSettings,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, `ReqwestHttpClient` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// The store must provide platform-appropriate protection for OAuth
    /// tokens and the pending PKCE verifier.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn now_playing(mut self, source: Arc<dyn NowPlayingSource>) -> Self {
        self.now_playing = Some(source);
        self
    }

    /// Overrides the time source used for token expiry checks.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Default: 5 minutes
    pub fn callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }

    pub fn lyrics_base_url(mut self, url: impl Into<String>) -> Self {
        self.lyrics.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Default: 128 entries. Zero disables the cache.
    pub fn lyrics_cache_capacity(mut self, capacity: usize) -> Self {
        self.lyrics.cache_capacity = capacity;
        self
    }

    pub fn lyrics_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.lyrics.user_agent = user_agent.into();
        self
    }

    pub fn lyrics_request_timeout(mut self, timeout: Duration) -> Self {
        self.lyrics.request_timeout = timeout;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   desktop default is available
    /// - [`Error::Config`] when a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            http_client,
            secure_store,
            now_playing: self.now_playing,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            callback_timeout: self.callback_timeout.unwrap_or(DEFAULT_CALLBACK_TIMEOUT),
            lyrics: self.lyrics,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
