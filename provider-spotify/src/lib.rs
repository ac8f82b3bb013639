//! # Spotify Provider
//!
//! Spotify Web API integration for the lyrics core.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`SpotifyNowPlaying`], a `NowPlayingSource` backed by
//!   `GET /me/player/currently-playing`
//! - [`spotify_oauth_config`], the PKCE client configuration for the Spotify
//!   accounts service
//!
//! The connector is stateless. The caller passes a fresh access token on every
//! request, so token refresh stays in `core-auth`.

pub mod config;
pub mod connector;
pub mod error;
pub mod types;

pub use config::{spotify_oauth_config, SPOTIFY_AUTH_URL, SPOTIFY_SCOPES, SPOTIFY_TOKEN_URL};
pub use connector::SpotifyNowPlaying;
pub use error::{Result, SpotifyError};
