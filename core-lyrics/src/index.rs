//! Lyrics index abstraction and the LRCLib implementation.

use crate::error::{LyricsError, Result};
use crate::types::LyricsCandidate;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::LyricsSettings;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A search against the lyrics index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Field search on track and artist, optionally narrowed by album
    Fields {
        track_name: String,
        artist_name: String,
        album_name: Option<String>,
    },
    /// Free-text search
    Text(String),
}

impl SearchQuery {
    /// URL query string for `GET /search`, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        match self {
            SearchQuery::Fields {
                track_name,
                artist_name,
                album_name,
            } => {
                let mut query = format!(
                    "track_name={}&artist_name={}",
                    urlencoding::encode(track_name),
                    urlencoding::encode(artist_name)
                );
                if let Some(album) = album_name {
                    query.push_str(&format!("&album_name={}", urlencoding::encode(album)));
                }
                query
            }
            SearchQuery::Text(text) => format!("q={}", urlencoding::encode(text)),
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchQuery::Fields {
                album_name: Some(_),
                ..
            } => write!(f, "track+artist+album"),
            SearchQuery::Fields { .. } => write!(f, "track+artist"),
            SearchQuery::Text(_) => write!(f, "free text"),
        }
    }
}

/// Searchable lyrics index.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LyricsIndex: Send + Sync {
    /// Return every row matching `query`, in index order.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<LyricsCandidate>>;
}

/// [LRCLib](https://lrclib.net) search client.
pub struct LrcLibIndex {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    user_agent: String,
    request_timeout: Duration,
}

impl LrcLibIndex {
    pub fn new(http_client: Arc<dyn HttpClient>, settings: &LyricsSettings) -> Self {
        Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_agent: settings.user_agent.clone(),
            request_timeout: settings.request_timeout,
        }
    }

    pub fn search_url(&self, query: &SearchQuery) -> String {
        format!("{}/search?{}", self.base_url, query.to_query_string())
    }
}

#[async_trait]
impl LyricsIndex for LrcLibIndex {
    #[instrument(skip(self), fields(kind = %query))]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<LyricsCandidate>> {
        let request = HttpRequest::new(HttpMethod::Get, self.search_url(query))
            .header("User-Agent", self.user_agent.clone())
            .header("Accept", "application/json")
            .timeout(self.request_timeout);

        let response = self.http_client.execute(request).await?;

        if response.status == 404 {
            return Ok(Vec::new());
        }

        if !response.is_success() {
            return Err(LyricsError::SearchFailed(format!(
                "LRCLib search returned HTTP {}",
                response.status
            )));
        }

        let candidates: Vec<LyricsCandidate> = response
            .json()
            .map_err(|e| LyricsError::SearchFailed(format!("Parse error: {}", e)))?;

        debug!(rows = candidates.len(), "LRCLib search completed");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn settings() -> LyricsSettings {
        LyricsSettings {
            base_url: "https://lrclib.test/api/".to_string(),
            cache_capacity: 8,
            user_agent: "lyrics-core-tests".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_field_query_encoding() {
        let query = SearchQuery::Fields {
            track_name: "Don't Stop Me Now".to_string(),
            artist_name: "Queen".to_string(),
            album_name: Some("Jazz & More".to_string()),
        };
        assert_eq!(
            query.to_query_string(),
            "track_name=Don%27t%20Stop%20Me%20Now&artist_name=Queen&album_name=Jazz%20%26%20More"
        );
        assert_eq!(query.to_string(), "track+artist+album");
    }

    #[test]
    fn test_text_query_encoding() {
        let query = SearchQuery::Text("Bohemian Rhapsody Queen".to_string());
        assert_eq!(query.to_query_string(), "q=Bohemian%20Rhapsody%20Queen");
    }

    #[tokio::test]
    async fn test_search_sends_user_agent_and_parses_rows() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|request| {
                request.method == HttpMethod::Get
                    && request.url == "https://lrclib.test/api/search?q=song%20artist"
                    && request.headers.get("User-Agent").map(String::as_str)
                        == Some("lyrics-core-tests")
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"[{"id":7,"trackName":"song","artistName":"artist","syncedLyrics":"[00:01.00]a"}]"#,
                ))
            });

        let index = LrcLibIndex::new(Arc::new(http), &settings());
        let rows = index
            .search(&SearchQuery::Text("song artist".to_string()))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(7));
        assert!(rows[0].has_synced_lyrics());
    }

    #[tokio::test]
    async fn test_search_not_found_is_empty() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(404, r#"{"message":"not found"}"#)));

        let index = LrcLibIndex::new(Arc::new(http), &settings());
        let rows = index
            .search(&SearchQuery::Text("x".to_string()))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_search_server_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, "oops")));

        let index = LrcLibIndex::new(Arc::new(http), &settings());
        assert!(matches!(
            index.search(&SearchQuery::Text("x".to_string())).await,
            Err(LyricsError::SearchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_search_transport_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("10s".to_string())));

        let index = LrcLibIndex::new(Arc::new(http), &settings());
        assert!(matches!(
            index.search(&SearchQuery::Text("x".to_string())).await,
            Err(LyricsError::Bridge(BridgeError::Timeout(_)))
        ));
    }
}
