//! # Track Lyrics Orchestrator
//!
//! Combines the token lifecycle, the now-playing source and the lyrics
//! resolver into a single "what is playing, and what are the words" call.
//!
//! Steps, each short-circuiting on failure:
//!
//! 1. ensure a usable credential (refreshing it if expired)
//! 2. ask the now-playing source for the active track
//! 3. resolve synced lyrics for that track

use crate::error::{CoreError, Result};
use bridge_traits::playback::{NowPlaying, NowPlayingSource};
use core_auth::TokenLifecycleManager;
use core_lyrics::{LyricsQuery, LyricsResolver, SyncedLyricLine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The currently playing track together with its synced lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub lyrics: Vec<SyncedLyricLine>,
}

impl Track {
    fn assemble(now_playing: NowPlaying, lyrics: Vec<SyncedLyricLine>) -> Self {
        Self {
            track_name: now_playing.track_name,
            artist_name: now_playing.artist_name,
            album_name: now_playing.album_name,
            duration_ms: now_playing.duration_ms,
            progress_ms: now_playing.progress_ms,
            lyrics,
        }
    }

    /// Index of the line being sung at the current progress, if any.
    pub fn active_line(&self) -> Option<usize> {
        self.lyrics
            .iter()
            .rposition(|line| line.offset_ms <= self.progress_ms)
    }
}

#[derive(Clone)]
pub struct TrackLyricsOrchestrator {
    tokens: Arc<TokenLifecycleManager>,
    now_playing: Arc<dyn NowPlayingSource>,
    lyrics: Arc<LyricsResolver>,
}

impl TrackLyricsOrchestrator {
    pub fn new(
        tokens: Arc<TokenLifecycleManager>,
        now_playing: Arc<dyn NowPlayingSource>,
        lyrics: Arc<LyricsResolver>,
    ) -> Self {
        Self {
            tokens,
            now_playing,
            lyrics,
        }
    }

    /// Fetch the active track and its synced lyrics.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Unauthenticated`] when no usable credential exists
    /// - [`CoreError::NowPlayingUnavailable`] when nothing is playing
    /// - [`CoreError::LyricsNotFound`] when every search tier is exhausted
    /// - [`CoreError::NowPlaying`] when the now-playing source fails
    #[instrument(skip(self))]
    pub async fn get_current_track_with_lyrics(&self) -> Result<Track> {
        if !self.tokens.is_authenticated().await? {
            debug!("Not authenticated");
            return Err(CoreError::Unauthenticated);
        }

        let access_token = self
            .tokens
            .access_token()
            .await?
            .ok_or(CoreError::Unauthenticated)?;

        let now_playing = self
            .now_playing
            .currently_playing(&access_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Now-playing lookup failed");
                CoreError::NowPlaying(e.to_string())
            })?
            .ok_or(CoreError::NowPlayingUnavailable)?;

        let query = LyricsQuery::new(
            now_playing.track_name.clone(),
            now_playing.artist_name.clone(),
            now_playing.album_name.clone(),
            now_playing.duration_ms,
        );
        let lyrics = self.lyrics.resolve(&query).await?;

        info!(
            track = %now_playing.track_name,
            lines = lyrics.len(),
            "Current track resolved with lyrics"
        );
        Ok(Track::assemble(now_playing, lyrics))
    }

    /// Same as [`get_current_track_with_lyrics`](Self::get_current_track_with_lyrics),
    /// abandoning in-flight work with [`CoreError::Cancelled`] once `cancel`
    /// fires.
    pub async fn get_current_track_with_lyrics_cancellable(
        &self,
        cancel: CancellationToken,
    ) -> Result<Track> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Track lookup cancelled");
                Err(CoreError::Cancelled)
            }
            result = self.get_current_track_with_lyrics() => result,
        }
    }
}
