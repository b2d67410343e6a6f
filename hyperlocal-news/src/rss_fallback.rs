use crate::fetcher::Fetcher;
use crate::parser::{is_valid_feed_content, parse_stories};
use crate::traits::ExternalNews;
use crate::types::{ExternalStory, HttpConfig, NewsError, Result};
use async_trait::async_trait;
use tracing::debug;

pub const DEFAULT_FALLBACK_NEWS_URL: &str = "https://news.google.com/rss/search";

/// Outside news for an area, taken from a search-style RSS endpoint.
pub struct RssNewsFeed {
    fetcher: Fetcher,
    search_url: String,
}

impl RssNewsFeed {
    pub fn new(http: HttpConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(http)?,
            search_url: DEFAULT_FALLBACK_NEWS_URL.to_string(),
        })
    }

    pub fn with_search_url(mut self, url: &str) -> Self {
        self.search_url = url.to_string();
        self
    }
}

#[async_trait]
impl ExternalNews for RssNewsFeed {
    async fn stories_for_area(&self, area_name: &str, limit: usize) -> Result<Vec<ExternalStory>> {
        debug!("Fetching fallback news for '{}'", area_name);
        let content = self
            .fetcher
            .fetch_text(&self.search_url, &[("q", area_name), ("hl", "en")])
            .await?;

        if !is_valid_feed_content(&content) {
            return Err(NewsError::Parse("fallback endpoint did not return a feed".to_string()));
        }

        parse_stories(&content, limit)
    }
}

/// Used when the fallback is disabled.
pub struct NoExternalNews;

#[async_trait]
impl ExternalNews for NoExternalNews {
    async fn stories_for_area(&self, _area_name: &str, _limit: usize) -> Result<Vec<ExternalStory>> {
        Ok(Vec::new())
    }
}
