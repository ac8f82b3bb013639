//! Now-playing bridge.
//!
//! The lyrics orchestrator asks a [`NowPlayingSource`] what the user is
//! listening to. Implementations call the streaming service's "currently
//! playing" endpoint with the caller's access token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Snapshot of the track reported as currently playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub track_name: String,
    /// Primary (first listed) artist.
    pub artist_name: String,
    pub album_name: String,
    pub duration_ms: u64,
    pub progress_ms: u64,
}

#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    /// Fetch the active track.
    ///
    /// Returns `Ok(None)` when nothing is playing.
    async fn currently_playing(&self, access_token: &str) -> Result<Option<NowPlaying>>;
}
