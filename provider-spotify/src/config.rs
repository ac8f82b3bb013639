//! Spotify accounts-service OAuth settings.

use core_auth::OAuthConfig;

pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Scopes needed to read (and later control) the active player.
pub const SPOTIFY_SCOPES: [&str; 3] = [
    "user-read-currently-playing",
    "user-read-playback-state",
    "user-modify-playback-state",
];

pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
pub const REDIRECT_URI_ENV: &str = "SPOTIFY_REDIRECT_URI";

/// Build the PKCE client configuration for Spotify.
///
/// `SPOTIFY_CLIENT_ID` and `SPOTIFY_REDIRECT_URI` override the arguments when
/// set in the environment.
pub fn spotify_oauth_config(client_id: &str, redirect_uri: &str) -> OAuthConfig {
    let client_id = std::env::var(CLIENT_ID_ENV).unwrap_or_else(|_| client_id.to_string());
    let redirect_uri =
        std::env::var(REDIRECT_URI_ENV).unwrap_or_else(|_| redirect_uri.to_string());

    OAuthConfig {
        provider: "spotify".to_string(),
        client_id,
        redirect_uri,
        scopes: SPOTIFY_SCOPES.iter().map(|s| s.to_string()).collect(),
        auth_url: SPOTIFY_AUTH_URL.to_string(),
        token_url: SPOTIFY_TOKEN_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spotify_endpoints_and_scopes() {
        let config = spotify_oauth_config("client-123", "lyricsapp://callback");

        assert_eq!(config.provider, "spotify");
        assert_eq!(config.auth_url, SPOTIFY_AUTH_URL);
        assert_eq!(config.token_url, SPOTIFY_TOKEN_URL);
        assert_eq!(config.scopes.len(), 3);
        assert!(config
            .scopes
            .contains(&"user-read-currently-playing".to_string()));
        if std::env::var(CLIENT_ID_ENV).is_err() {
            assert_eq!(config.client_id, "client-123");
            assert!(config.validate().is_ok());
        }
    }
}
