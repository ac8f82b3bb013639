//! # Synced Lyrics
//!
//! Resolves time-synchronized lyrics for a track from an external index and
//! parses the LRC line format.
//!
//! ## Features
//!
//! - Three-tier search cascade against LRCLib
//! - Tolerant LRC parser (malformed lines are skipped, never fatal)
//! - In-memory LRU cache of resolved lyrics
//! - `CoreEvent::Lyrics` emission for resolved and missing lyrics
//!
//! ## Usage
//!
//! ```no_run
//! use core_lyrics::{LrcLibIndex, LyricsQuery, LyricsResolver};
//! use core_runtime::config::LyricsSettings;
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::http::HttpClient;
//! # async fn example(http_client: Arc<dyn HttpClient>) -> core_lyrics::Result<()> {
//! let settings = LyricsSettings::default();
//! let index = Arc::new(LrcLibIndex::new(http_client, &settings));
//! let resolver = LyricsResolver::new(index, EventBus::new(16), settings.cache_capacity);
//!
//! let query = LyricsQuery::new("Song", "Artist", "Album", 215_000);
//! for line in resolver.resolve(&query).await? {
//!     println!("{:>8} {}", line.offset_ms, line.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod resolver;
pub mod types;

pub use error::{LyricsError, Result};
pub use index::{LrcLibIndex, LyricsIndex, SearchQuery};
pub use resolver::LyricsResolver;
pub use types::{LyricsCandidate, LyricsQuery, SyncedLyricLine};
