//! # Lyrics Resolver
//!
//! Finds synced lyrics for a track by searching the index with progressively
//! looser queries:
//!
//! 1. track + artist + album
//! 2. track + artist
//! 3. free text `"<track> <artist>"`
//!
//! The first row with non-blank synced lyrics wins and is parsed. A tier whose
//! search fails is logged and treated as having returned nothing.
//!
//! Resolved lyrics are kept in an LRU cache keyed by track, artist and album,
//! so polling the same track does not hit the index again.

use crate::error::{LyricsError, Result};
use crate::index::{LyricsIndex, SearchQuery};
use crate::parser;
use crate::types::{LyricsCandidate, LyricsQuery, SyncedLyricLine};
use core_runtime::events::{CoreEvent, EventBus, LyricsEvent};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

type CacheKey = (String, String, String);

pub struct LyricsResolver {
    index: Arc<dyn LyricsIndex>,
    event_bus: EventBus,
    cache: Option<Mutex<LruCache<CacheKey, Arc<Vec<SyncedLyricLine>>>>>,
}

impl LyricsResolver {
    /// Create a resolver. A `cache_capacity` of 0 disables caching.
    pub fn new(index: Arc<dyn LyricsIndex>, event_bus: EventBus, cache_capacity: usize) -> Self {
        Self {
            index,
            event_bus,
            cache: NonZeroUsize::new(cache_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Search queries in cascade order.
    pub fn tiers(query: &LyricsQuery) -> [SearchQuery; 3] {
        [
            SearchQuery::Fields {
                track_name: query.track_name.clone(),
                artist_name: query.artist_name.clone(),
                album_name: Some(query.album_name.clone()),
            },
            SearchQuery::Fields {
                track_name: query.track_name.clone(),
                artist_name: query.artist_name.clone(),
                album_name: None,
            },
            SearchQuery::Text(format!("{} {}", query.track_name, query.artist_name)),
        ]
    }

    /// Resolve synced lyrics for `query`.
    ///
    /// Returns [`LyricsError::NotFound`] once every tier is exhausted.
    #[instrument(skip(self), fields(track = %query.track_name, artist = %query.artist_name))]
    pub async fn resolve(&self, query: &LyricsQuery) -> Result<Vec<SyncedLyricLine>> {
        let key = cache_key(query);

        if let Some(cache) = &self.cache {
            if let Some(lines) = cache.lock().await.get(&key) {
                debug!(lines = lines.len(), "Lyrics cache hit");
                let lines = lines.as_ref().clone();
                self.emit_resolved(query, 0, lines.len());
                return Ok(lines);
            }
        }

        for (position, search) in Self::tiers(query).iter().enumerate() {
            let tier = position as u8 + 1;

            let candidates = match self.index.search(search).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(tier, kind = %search, error = %e, "Lyrics search failed; trying next tier");
                    continue;
                }
            };

            let Some(winner) = first_synced(&candidates) else {
                debug!(tier, rows = candidates.len(), "No synced lyrics at tier");
                continue;
            };

            let lines = parser::parse(winner);
            info!(tier, lines = lines.len(), "Resolved synced lyrics");

            if let Some(cache) = &self.cache {
                cache.lock().await.put(key, Arc::new(lines.clone()));
            }
            self.emit_resolved(query, tier, lines.len());
            return Ok(lines);
        }

        info!("No synced lyrics found at any tier");
        let _ = self
            .event_bus
            .emit(CoreEvent::Lyrics(LyricsEvent::NotFound {
                track: query.track_name.clone(),
                artist: query.artist_name.clone(),
            }));

        Err(LyricsError::NotFound {
            track: query.track_name.clone(),
            artist: query.artist_name.clone(),
        })
    }

    /// Drop every cached entry.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().await.clear();
        }
    }

    /// Number of cached tracks.
    pub async fn cached_len(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.lock().await.len(),
            None => 0,
        }
    }

    fn emit_resolved(&self, query: &LyricsQuery, tier: u8, line_count: usize) {
        let _ = self
            .event_bus
            .emit(CoreEvent::Lyrics(LyricsEvent::Resolved {
                track: query.track_name.clone(),
                artist: query.artist_name.clone(),
                tier,
                line_count,
            }));
    }
}

fn cache_key(query: &LyricsQuery) -> CacheKey {
    (
        query.track_name.clone(),
        query.artist_name.clone(),
        query.album_name.clone(),
    )
}

fn first_synced(candidates: &[LyricsCandidate]) -> Option<&str> {
    candidates
        .iter()
        .find(|candidate| candidate.has_synced_lyrics())
        .and_then(|candidate| candidate.synced_lyrics.as_deref())
}
