use crate::traits::ImageSearch;
use crate::types::{HttpConfig, ImageCacheConfig, NewsError, Result};
use crate::utils::text::normalize_text;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const UNSPLASH_API_URL: &str = "https://api.unsplash.com";

/// Upper bound on how long any image lookup stays cached.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
    full: Option<String>,
}

/// First usable image URL in an Unsplash `/search/photos` body.
pub fn extract_first_image(body: &str) -> Result<Option<String>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .next()
        .and_then(|photo| photo.urls.regular.or(photo.urls.full)))
}

/// Query sent to the image API: the category hint is appended unless it is
/// the generic "news" bucket or already part of the query.
pub fn build_query(query: &str, category: Option<&str>) -> String {
    let query = query.trim();
    match category.map(str::trim) {
        Some(cat) if !cat.is_empty()
            && !cat.eq_ignore_ascii_case("news")
            && !query.to_lowercase().contains(&cat.to_lowercase()) =>
        {
            format!("{} {}", query, cat)
        }
        _ => query.to_string(),
    }
}

pub struct UnsplashImageSearch {
    client: Client,
    access_key: String,
    base_url: String,
}

impl UnsplashImageSearch {
    pub fn new(access_key: &str, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&http.user_agent)
            .timeout(Duration::from_secs(http.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            access_key: access_key.to_string(),
            base_url: UNSPLASH_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ImageSearch for UnsplashImageSearch {
    async fn search(&self, query: &str, category: Option<&str>) -> Result<Option<String>> {
        let full_query = build_query(query, category);
        if full_query.is_empty() {
            return Ok(None);
        }

        debug!("Searching Unsplash for '{}'", full_query);
        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .query(&[
                ("query", full_query.as_str()),
                ("per_page", "1"),
                ("orientation", "landscape"),
                ("client_id", self.access_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::collaborator(
                "unsplash",
                format!("HTTP {}: {}", status, status.canonical_reason().unwrap_or("Unknown")),
            ));
        }

        let body = response.text().await?;
        extract_first_image(&body)
    }
}

/// Stand-in used when no image credential is configured.
pub struct NoImageSearch;

#[async_trait]
impl ImageSearch for NoImageSearch {
    async fn search(&self, _query: &str, _category: Option<&str>) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    url: Option<String>,
    expires_at: Instant,
}

/// Process-wide image lookup cache keyed by normalized query. Cloning shares
/// the same underlying map.
#[derive(Clone, Default)]
pub struct ImageCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(query: &str, category: Option<&str>) -> String {
        format!(
            "{}|{}",
            normalize_text(query),
            category.map(normalize_text).unwrap_or_default()
        )
    }

    /// `Some(cached)` on a live entry; the inner option is the cached URL or a cached miss.
    pub async fn get(&self, key: &str) -> Option<Option<String>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.url.clone())
    }

    /// Lifetimes longer than [`MAX_CACHE_TTL`] are capped.
    pub async fn insert(&self, key: String, url: Option<String>, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_CACHE_TTL))
            .unwrap_or(now);
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry { url, expires_at });
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Caching decorator: hits live for `hit_ttl`, misses and failures for `miss_ttl`.
pub struct CachedImageSearch<S> {
    inner: S,
    cache: ImageCache,
    config: ImageCacheConfig,
}

impl<S: ImageSearch> CachedImageSearch<S> {
    pub fn new(inner: S, cache: ImageCache, config: ImageCacheConfig) -> Self {
        Self { inner, cache, config }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }
}

#[async_trait]
impl<S: ImageSearch> ImageSearch for CachedImageSearch<S> {
    async fn search(&self, query: &str, category: Option<&str>) -> Result<Option<String>> {
        let key = ImageCache::key(query, category);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Image cache hit for '{}'", key);
            return Ok(cached);
        }

        match self.inner.search(query, category).await {
            Ok(Some(url)) => {
                info!("Found cover image for '{}'", query);
                self.cache.insert(key, Some(url.clone()), self.config.hit_ttl).await;
                Ok(Some(url))
            }
            Ok(None) => {
                self.cache.insert(key, None, self.config.miss_ttl).await;
                Ok(None)
            }
            Err(e) => {
                warn!("Image search failed for '{}': {}", query, e);
                self.cache.insert(key, None, self.config.miss_ttl).await;
                Err(e)
            }
        }
    }
}
