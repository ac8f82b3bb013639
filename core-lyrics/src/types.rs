use serde::{Deserialize, Serialize};

/// One timed lyric line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedLyricLine {
    /// Offset from the start of the track in milliseconds
    pub offset_ms: u64,
    /// Line text; empty for an instrumental gap
    pub text: String,
}

impl SyncedLyricLine {
    pub fn new(offset_ms: u64, text: impl Into<String>) -> Self {
        Self {
            offset_ms,
            text: text.into(),
        }
    }
}

/// One row of an LRCLib search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsCandidate {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub album_name: Option<String>,
    /// Track length in seconds
    #[serde(default, rename = "duration")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

impl LyricsCandidate {
    /// `true` when the row carries synced lyrics with any visible content.
    pub fn has_synced_lyrics(&self) -> bool {
        self.synced_lyrics
            .as_deref()
            .is_some_and(|lyrics| !lyrics.trim().is_empty())
    }
}

/// Track identity used to look lyrics up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LyricsQuery {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration_ms: u64,
}

impl LyricsQuery {
    pub fn new(
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
        album_name: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: album_name.into(),
            duration_ms,
        }
    }
}
