//! Core service façade and composition root.
//!
//! This crate wires host-provided bridge implementations (HTTP, secure
//! storage, now-playing, clock) into the auth and lyrics crates and hands the
//! host one [`CoreService`] to drive. Desktop apps typically keep the default
//! `desktop-shims` feature, which lets [`CoreConfig`] fall back to the
//! `bridge-desktop` HTTP client and keyring store.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//! use provider_spotify::spotify_oauth_config;
//!
//! let config = CoreConfig::builder().build()?;
//! let oauth = spotify_oauth_config("my-client-id", "lyricsapp://callback");
//! let core = CoreService::new(config, oauth)?;
//!
//! let login = core.begin_login().await?;
//! println!("Open {}", login.url);
//! // ... the host later forwards the redirect:
//! core.handle_redirect("lyricsapp://callback?code=abc").await?;
//!
//! let track = core.get_current_track_with_lyrics().await?;
//! println!("{} - {} ({} lines)", track.artist_name, track.track_name, track.lyrics.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod orchestrator;

pub use error::{CoreError, Result};
pub use orchestrator::{Track, TrackLyricsOrchestrator};

use std::sync::Arc;

use bridge_traits::playback::NowPlayingSource;
use core_auth::{
    AuthorizationUrl, CallbackOutcome, CredentialVault, FlowState, OAuthConfig,
    OAuthFlowController, TokenLifecycleManager,
};
use core_lyrics::{LrcLibIndex, LyricsResolver};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, Receiver};
use provider_spotify::SpotifyNowPlaying;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    event_bus: EventBus,
    flow: OAuthFlowController,
    tokens: Arc<TokenLifecycleManager>,
    lyrics: Arc<LyricsResolver>,
    orchestrator: TrackLyricsOrchestrator,
}

impl CoreService {
    /// Build every component from the validated configuration.
    ///
    /// When the config carries no now-playing source the Spotify connector is
    /// used, sharing the configured HTTP client.
    pub fn new(config: CoreConfig, oauth: OAuthConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let vault = Arc::new(CredentialVault::new(config.secure_store.clone()));

        let flow = OAuthFlowController::new(
            oauth.clone(),
            config.http_client.clone(),
            vault.clone(),
            event_bus.clone(),
            config.clock.clone(),
            config.callback_timeout,
        )?;

        let tokens = Arc::new(TokenLifecycleManager::new(
            oauth,
            config.http_client.clone(),
            vault,
            event_bus.clone(),
            config.clock.clone(),
        )?);

        let index = Arc::new(LrcLibIndex::new(config.http_client.clone(), &config.lyrics));
        let lyrics = Arc::new(LyricsResolver::new(
            index,
            event_bus.clone(),
            config.lyrics.cache_capacity,
        ));

        let now_playing: Arc<dyn NowPlayingSource> = match config.now_playing {
            Some(source) => source,
            None => Arc::new(SpotifyNowPlaying::new(config.http_client.clone())),
        };

        let orchestrator = TrackLyricsOrchestrator::new(tokens.clone(), now_playing, lyrics.clone());

        info!(
            provider = %flow.config().provider,
            lyrics_base_url = %config.lyrics.base_url,
            "Core service initialized"
        );

        Ok(Self {
            event_bus,
            flow,
            tokens,
            lyrics,
            orchestrator,
        })
    }

    /// Subscribe to auth and lyrics events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Subscribe to sign-in and sign-out transitions only.
    pub fn auth_status_changes(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe()).filter(CoreEvent::is_auth_status_change)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn auth_flow(&self) -> &OAuthFlowController {
        &self.flow
    }

    pub fn tokens(&self) -> &TokenLifecycleManager {
        &self.tokens
    }

    pub fn lyrics(&self) -> &LyricsResolver {
        &self.lyrics
    }

    pub fn orchestrator(&self) -> &TrackLyricsOrchestrator {
        &self.orchestrator
    }

    /// Start a PKCE login and return the URL the host must open.
    pub async fn begin_login(&self) -> Result<AuthorizationUrl> {
        Ok(self.flow.begin_login().await?)
    }

    /// Forward a redirect URI to the waiting login listener.
    ///
    /// Returns `Ok(None)` when no login is waiting, for instance after the
    /// callback deadline has passed.
    pub async fn handle_redirect(&self, uri: &str) -> Result<Option<CallbackOutcome>> {
        Ok(self.flow.deliver_callback(uri).await.transpose()?)
    }

    pub async fn cancel_login(&self) -> Result<bool> {
        Ok(self.flow.cancel_login().await?)
    }

    pub async fn login_state(&self) -> FlowState {
        self.flow.state().await
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.tokens.is_authenticated().await?)
    }

    pub async fn logout(&self) -> Result<()> {
        Ok(self.tokens.logout().await?)
    }

    pub async fn get_current_track_with_lyrics(&self) -> Result<Track> {
        self.orchestrator.get_current_track_with_lyrics().await
    }

    pub async fn get_current_track_with_lyrics_cancellable(
        &self,
        cancel: CancellationToken,
    ) -> Result<Track> {
        self.orchestrator
            .get_current_track_with_lyrics_cancellable(cancel)
            .await
    }
}
