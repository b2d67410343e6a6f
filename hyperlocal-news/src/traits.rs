use crate::types::{ExternalStory, GeneratedArticle, Result};
use async_trait::async_trait;

/// Text-generation collaborator.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Human-readable name for logs
    fn adapter_name(&self) -> String;

    /// Turn a prompt built from resident posts into article records.
    /// Transport failures, non-2xx answers and output that does not match
    /// the requested schema are all errors.
    async fn generate_articles(&self, prompt: &str) -> Result<Vec<GeneratedArticle>>;

    /// Ask for a single category label for a classified ad.
    async fn categorize_advertisement(&self, content: &str) -> Result<String>;
}

/// Image-search collaborator. `Ok(None)` means the search ran and found nothing.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, query: &str, category: Option<&str>) -> Result<Option<String>>;
}

/// Source of outside news used when an area has no local articles yet.
#[async_trait]
pub trait ExternalNews: Send + Sync {
    async fn stories_for_area(&self, area_name: &str, limit: usize) -> Result<Vec<ExternalStory>>;
}
