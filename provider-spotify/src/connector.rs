//! Spotify now-playing connector
//!
//! Asks the Web API what the user is currently listening to. No retries: the
//! orchestrator is polled, so a failed request is simply repeated on the next
//! poll.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    http::{HttpClient, HttpMethod, HttpRequest},
    NowPlaying, NowPlayingSource,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::SpotifyError;
use crate::types::CurrentlyPlayingResponse;

/// Spotify Web API base URL
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `NowPlayingSource` backed by the Spotify Web API.
pub struct SpotifyNowPlaying {
    http_client: Arc<dyn HttpClient>,
    api_base: String,
}

impl SpotifyNowPlaying {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_api_base(http_client, SPOTIFY_API_BASE)
    }

    /// Point the connector at a different API root.
    pub fn with_api_base(http_client: Arc<dyn HttpClient>, api_base: impl Into<String>) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn currently_playing_url(&self) -> String {
        format!("{}/me/player/currently-playing", self.api_base)
    }
}

#[async_trait]
impl NowPlayingSource for SpotifyNowPlaying {
    #[instrument(skip(self, access_token))]
    async fn currently_playing(&self, access_token: &str) -> Result<Option<NowPlaying>> {
        let request = HttpRequest::new(HttpMethod::Get, self.currently_playing_url())
            .bearer_token(access_token)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await?;

        match response.status {
            204 => {
                debug!("Nothing is playing");
                return Ok(None);
            }
            401 => {
                warn!("Spotify rejected the access token");
                return Err(SpotifyError::Unauthorized.into());
            }
            status if !response.is_success() => {
                warn!("Currently-playing request failed: status={}", status);
                return Err(SpotifyError::ApiError {
                    status_code: status,
                    message: String::from_utf8_lossy(&response.body).to_string(),
                }
                .into());
            }
            _ => {}
        }

        let body: CurrentlyPlayingResponse = serde_json::from_slice(&response.body).map_err(|e| {
            SpotifyError::ParseError(format!("Failed to parse currently-playing response: {}", e))
        })?;

        let now_playing = body.into_now_playing();
        match &now_playing {
            Some(track) => info!(
                track = %track.track_name,
                artist = %track.artist_name,
                "Spotify reports an active track"
            ),
            None => debug!("Playback active without a track item"),
        }

        Ok(now_playing)
    }
}
