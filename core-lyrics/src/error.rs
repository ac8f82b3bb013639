use thiserror::Error;

#[derive(Error, Debug)]
pub enum LyricsError {
    /// Every search tier came back without synced lyrics.
    #[error("No synced lyrics found for \"{track}\" by {artist}")]
    NotFound { track: String, artist: String },

    #[error("Lyrics search failed: {0}")]
    SearchFailed(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, LyricsError>;
