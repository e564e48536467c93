//! Text search capability
//!
//! Maps a free-text query to the best-matching canonical page URL. The
//! default implementation queries the YouTube Data API v3 search endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use juke_common::{Error, Result};

use crate::config::SearchConfig;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Search capability: free text in, canonical URL out
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Best-matching canonical URL for `terms`, or None when the search
    /// comes back empty
    async fn best_match(&self, terms: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// YouTube Data API v3 search backend
pub struct YoutubeSearch {
    client: reqwest::Client,
    config: SearchConfig,
}

impl YoutubeSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SearchBackend for YoutubeSearch {
    async fn best_match(&self, terms: &str) -> Result<Option<String>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("search.api_key is not set".to_string()))?;

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("type", "video"),
                ("part", "snippet"),
                ("safeSearch", "none"),
                ("q", terms),
                ("videoCategoryId", "10"),
                ("key", api_key),
                ("maxResults", &self.config.max_results.to_string()),
                ("regionCode", &self.config.region),
                ("relevanceLanguage", &self.config.language),
            ])
            .send()
            .await?
            .error_for_status()?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("unexpected search response: {}", e)))?;

        let best = parsed
            .items
            .into_iter()
            .find_map(|item| item.id.video_id)
            .map(|id| format!("https://www.youtube.com/watch?v={}", id));
        debug!("search '{}' -> {:?}", terms, best);
        Ok(best)
    }
}
