use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
// Core records live in the interfaces crate
pub use interfaces::defs::{AdCategory, Advertisement, Area, Article, NewAdvertisement, NewArticle, NewPost, PageView, Post};

/// One article record as returned by the text-generation collaborator.
/// Every field is optional on the wire; records without a title or content
/// are dropped by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_keywords: Option<String>,
    #[serde(default)]
    pub reporter_name: Option<String>,
}

impl GeneratedArticle {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_image_keywords(mut self, keywords: &str) -> Self {
        self.image_keywords = Some(keywords.to_string());
        self
    }

    pub fn with_reporter(mut self, name: &str) -> Self {
        self.reporter_name = Some(name.to_string());
        self
    }
}

/// Top-level JSON object the generator is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedBatch {
    pub articles: Vec<GeneratedArticle>,
}

/// A story pulled from the external RSS fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalStory {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    pub max_feed_size_mb: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Hyperlocal-News/1.0".to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
            max_feed_size_mb: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    pub hit_ttl: Duration,
    pub miss_ttl: Duration,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            hit_ttl: Duration::from_secs(7 * 24 * 3600),
            miss_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Area name is empty")]
    InvalidAreaName,

    #[error("Area not found: {name}")]
    AreaNotFound { name: String },

    #[error("Article not found: {id}")]
    ArticleNotFound { id: i64 },

    #[error("{service} failed: {message}")]
    Collaborator { service: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

impl NewsError {
    pub fn collaborator(service: &str, message: impl Into<String>) -> Self {
        NewsError::Collaborator {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Configuration errors fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NewsError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, NewsError>;
