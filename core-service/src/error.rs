use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Not authenticated; sign in first")]
    Unauthenticated,

    #[error("No track is currently playing")]
    NowPlayingUnavailable,

    #[error("No synced lyrics found for '{track}' by '{artist}'")]
    LyricsNotFound { track: String, artist: String },

    #[error("Failed to fetch the currently playing track: {0}")]
    NowPlaying(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Failed to fetch lyrics: {0}")]
    Lyrics(core_lyrics::LyricsError),
}

impl From<core_lyrics::LyricsError> for CoreError {
    fn from(err: core_lyrics::LyricsError) -> Self {
        match err {
            core_lyrics::LyricsError::NotFound { track, artist } => {
                CoreError::LyricsNotFound { track, artist }
            }
            other => CoreError::Lyrics(other),
        }
    }
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::InitializationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
