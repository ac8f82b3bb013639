use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpotifyError {
    #[error("Spotify API error ({status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Access token rejected by Spotify")]
    Unauthorized,

    #[error("Failed to parse Spotify response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SpotifyError>;

impl From<SpotifyError> for BridgeError {
    fn from(error: SpotifyError) -> Self {
        match error {
            SpotifyError::BridgeError(inner) => inner,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
