use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// A callback arrived but no PKCE verifier is stored.
    #[error("Code verifier not found; start a new login")]
    MissingVerifier,

    #[error("Token exchange failed{}: {message}", fmt_status(.status))]
    ExchangeFailed { status: Option<u16>, message: String },

    #[error("Token refresh failed{}: {message}", fmt_status(.status))]
    RefreshFailed { status: Option<u16>, message: String },

    /// The login attempt was superseded or cancelled before it completed.
    #[error("Login attempt was superseded or cancelled")]
    AttemptAbandoned,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl From<BridgeError> for AuthError {
    fn from(err: BridgeError) -> Self {
        AuthError::SecureStorageUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_include_status() {
        let err = AuthError::RefreshFailed {
            status: Some(400),
            message: "invalid_grant".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Token refresh failed (HTTP 400): invalid_grant"
        );

        let err = AuthError::ExchangeFailed {
            status: None,
            message: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "Token exchange failed: connection reset");
    }
}
