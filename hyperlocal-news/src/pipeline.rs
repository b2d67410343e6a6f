//! Incremental article generation.
//!
//! Each run takes the posts of one area that arrived after the area's
//! watermark, asks the text generator to turn them into articles, decorates
//! every article with a cover image and stores it. The watermark only moves
//! after at least one article was stored, so a failed run is simply repeated
//! next time over the same posts.

use crate::area_resolver::AreaResolver;
use crate::llm_adapter::generation_prompt;
use crate::retry::RetryPolicy;
use crate::store::NewsStore;
use crate::traits::{ImageSearch, LlmAdapter};
use crate::types::{Area, Article, GeneratedArticle, NewArticle, Post, Result};
use crate::utils::normalize_area_name;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CATEGORY: &str = "news";

/// Result of one `generate` call.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub created_count: usize,
    pub articles: Vec<Article>,
    /// Watermark written by this run, if it advanced.
    pub watermark: Option<DateTime<Utc>>,
    /// Generator records dropped for missing a title or content.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RegenerateOptions {
    /// Restrict to these areas; empty means every area.
    pub area_names: Vec<String>,
    /// Also process areas that already have articles.
    pub skip_existing_check: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegenerationReport {
    pub areas_processed: usize,
    pub areas_skipped: usize,
    pub articles_created: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverImageReport {
    pub total: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
}

struct PersistedBatch {
    articles: Vec<Article>,
    skipped: usize,
}

pub struct NewsGenerationPipeline {
    store: Arc<dyn NewsStore>,
    llm: Arc<dyn LlmAdapter>,
    images: Arc<dyn ImageSearch>,
    retry: RetryPolicy,
}

impl NewsGenerationPipeline {
    pub fn new(store: Arc<dyn NewsStore>, llm: Arc<dyn LlmAdapter>, images: Arc<dyn ImageSearch>) -> Self {
        Self {
            store,
            llm,
            images,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate articles for an existing area, looked up by exact normalized name.
    /// Only an empty name, an unknown area or a failed lookup of the area
    /// itself are errors. Everything after that fails soft.
    pub async fn generate(&self, area_name: &str) -> Result<GenerationOutcome> {
        let area = AreaResolver::new(self.store.clone()).find(area_name).await?;
        Ok(self.generate_for_area(&area).await)
    }

    pub async fn generate_for_area(&self, area: &Area) -> GenerationOutcome {
        // Re-read so the watermark is current even if `area` is stale.
        let watermark = match self.store.get_area(area.id).await {
            Ok(Some(current)) => current.last_generated_at,
            Ok(None) => area.last_generated_at,
            Err(e) => {
                error!("Failed to read watermark of area '{}': {}", area.name, e);
                return GenerationOutcome::default();
            }
        };
        let now = Utc::now();
        debug!("Area '{}' watermark: {:?}", area.name, watermark);

        let posts: Vec<Post> = match self.store.find_posts(area.id, watermark).await {
            Ok(posts) => posts.into_iter().filter(|post| post.created_at <= now).collect(),
            Err(e) => {
                error!("Failed to load posts for area '{}': {}", area.name, e);
                return GenerationOutcome::default();
            }
        };

        if posts.is_empty() {
            info!("No new posts for area '{}', nothing to generate", area.name);
            return GenerationOutcome::default();
        }
        info!("Aggregated {} new posts for area '{}'", posts.len(), area.name);

        let Some(records) = self.request_articles(area, &posts).await else {
            return GenerationOutcome::default();
        };

        let batch = self.persist_records(area, records).await;
        let mut outcome = GenerationOutcome {
            created_count: batch.articles.len(),
            articles: batch.articles,
            watermark: None,
            skipped: batch.skipped,
        };

        if outcome.created_count == 0 {
            warn!("No articles persisted for area '{}', watermark left unchanged", area.name);
            return outcome;
        }

        match self.store.set_last_generated_at(area.id, now).await {
            Ok(()) => {
                info!("Advanced watermark of area '{}' to {}", area.name, now);
                outcome.watermark = Some(now);
            }
            Err(e) => error!("Failed to advance watermark of area '{}': {}", area.name, e),
        }

        outcome
    }

    /// Rebuild articles from every post of the selected areas, ignoring and
    /// never touching the watermark.
    pub async fn regenerate(&self, options: &RegenerateOptions) -> Result<RegenerationReport> {
        let mut areas = self.store.list_areas().await?;
        let mut report = RegenerationReport::default();

        if !options.area_names.is_empty() {
            let wanted: Vec<String> = options.area_names.iter().map(|n| normalize_area_name(n)).collect();
            for name in &wanted {
                if !areas.iter().any(|a| &a.name == name) {
                    warn!("Area '{}' does not exist, skipping", name);
                    report.areas_skipped += 1;
                }
            }
            areas.retain(|a| wanted.contains(&a.name));
        }

        for area in &areas {
            if !options.skip_existing_check {
                match self.store.find_articles(area.id).await {
                    Ok(existing) if !existing.is_empty() => {
                        info!("Area '{}' already has {} articles, skipping", area.name, existing.len());
                        report.areas_skipped += 1;
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Failed to load articles for area '{}': {}", area.name, e);
                        report.areas_skipped += 1;
                        continue;
                    }
                }
            }

            let posts = match self.store.find_posts(area.id, None).await {
                Ok(posts) if !posts.is_empty() => posts,
                Ok(_) => {
                    info!("Area '{}' has no posts, skipping", area.name);
                    report.areas_skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("Failed to load posts for area '{}': {}", area.name, e);
                    report.areas_skipped += 1;
                    continue;
                }
            };

            report.areas_processed += 1;
            if let Some(records) = self.request_articles(area, &posts).await {
                let batch = self.persist_records(area, records).await;
                info!("Regenerated {} articles for area '{}'", batch.articles.len(), area.name);
                report.articles_created += batch.articles.len();
            }
        }

        info!(
            "Regeneration finished: {} areas processed, {} skipped, {} articles created",
            report.areas_processed, report.areas_skipped, report.articles_created
        );
        Ok(report)
    }

    /// Re-run the image search for every stored article and save changed covers.
    pub async fn update_cover_images(&self) -> Result<CoverImageReport> {
        let articles = self.store.list_articles().await?;
        let mut report = CoverImageReport {
            total: articles.len(),
            ..Default::default()
        };

        for article in &articles {
            if article.title.trim().is_empty() {
                report.skipped += 1;
                continue;
            }

            match self.images.search(&article.title, Some(&article.category)).await {
                Ok(Some(url)) if article.cover_image.as_deref() != Some(url.as_str()) => {
                    match self.store.update_cover_image(article.id, Some(&url)).await {
                        Ok(()) => {
                            debug!("Updated cover image of article {}", article.id);
                            report.updated += 1;
                        }
                        Err(e) => {
                            error!("Failed to save cover image of article {}: {}", article.id, e);
                            report.failed += 1;
                        }
                    }
                }
                Ok(_) => report.unchanged += 1,
                Err(e) => {
                    warn!("Image search failed for article {}: {}", article.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Cover images: {} total, {} updated, {} unchanged, {} failed, {} skipped",
            report.total, report.updated, report.unchanged, report.failed, report.skipped
        );
        Ok(report)
    }

    /// `None` when every attempt failed or the generator had nothing to say.
    async fn request_articles(&self, area: &Area, posts: &[Post]) -> Option<Vec<GeneratedArticle>> {
        let prompt = generation_prompt(posts);
        let label = format!("{} for area '{}'", self.llm.adapter_name(), area.name);

        match self.retry.run(&label, || self.llm.generate_articles(&prompt)).await {
            Ok(records) if records.is_empty() => {
                warn!("Generator returned no articles for area '{}'", area.name);
                None
            }
            Ok(records) => {
                debug!("Generator returned {} records for area '{}'", records.len(), area.name);
                Some(records)
            }
            Err(e) => {
                error!("Article generation failed for area '{}': {}", area.name, e);
                None
            }
        }
    }

    async fn persist_records(&self, area: &Area, records: Vec<GeneratedArticle>) -> PersistedBatch {
        let mut batch = PersistedBatch {
            articles: Vec::new(),
            skipped: 0,
        };

        for record in records {
            let title = non_empty(record.title);
            let content = non_empty(record.content);
            let (Some(title), Some(content)) = (title, content) else {
                warn!("Skipping generated record without title or content");
                batch.skipped += 1;
                continue;
            };

            let category = non_empty(record.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            let query = non_empty(record.image_keywords).unwrap_or_else(|| title.clone());
            let cover_image = self.cover_image(&query, &category).await;

            let new_article = NewArticle {
                area_id: area.id,
                title,
                content,
                category,
                cover_image,
                reporter_name: non_empty(record.reporter_name),
            };

            match self.store.create_article(new_article).await {
                Ok(article) => {
                    info!("Created article {} '{}' in area '{}'", article.id, article.title, area.name);
                    batch.articles.push(article);
                }
                Err(e) => error!("Failed to save article for area '{}': {}", area.name, e),
            }
        }

        batch
    }

    async fn cover_image(&self, query: &str, category: &str) -> Option<String> {
        match self.images.search(query, Some(category)).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Cover image lookup failed for '{}': {}", query, e);
                None
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
