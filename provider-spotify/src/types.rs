//! Spotify Web API response types
//!
//! Only the fields the lyrics core reads are modelled; serde ignores the rest.

use bridge_traits::NowPlaying;
use serde::{Deserialize, Serialize};

/// `GET /me/player/currently-playing` response
///
/// See: https://developer.spotify.com/documentation/web-api/reference/get-the-users-currently-playing-track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentlyPlayingResponse {
    /// Playing item; `null` for ads, local gaps and private sessions
    #[serde(default)]
    pub item: Option<SpotifyTrack>,

    /// Playback position in milliseconds
    #[serde(default)]
    pub progress_ms: Option<u64>,

    #[serde(default)]
    pub is_playing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,

    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,

    /// Absent for podcast episodes
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,

    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
}

impl CurrentlyPlayingResponse {
    /// Flatten into the bridge snapshot. `None` when no item is attached.
    pub fn into_now_playing(self) -> Option<NowPlaying> {
        let item = self.item?;
        let artist_name = item
            .artists
            .into_iter()
            .next()
            .map(|artist| artist.name)
            .unwrap_or_default();
        let album_name = item.album.map(|album| album.name).unwrap_or_default();

        Some(NowPlaying {
            track_name: item.name,
            artist_name,
            album_name,
            duration_ms: item.duration_ms,
            progress_ms: self.progress_ms.unwrap_or(0),
        })
    }
}
