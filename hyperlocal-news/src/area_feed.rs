use crate::store::NewsStore;
use crate::traits::ExternalNews;
use crate::types::{Article, ExternalStory, NewsError, Result};
use crate::utils::normalize_area_name;
use crate::utils::text::slugify;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_EXTERNAL_LIMIT: usize = 10;

/// What an area page shows: its own articles, or outside news while it has none.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaFeed {
    Local(Vec<Article>),
    External(Vec<ExternalStory>),
}

impl AreaFeed {
    pub fn is_empty(&self) -> bool {
        match self {
            AreaFeed::Local(articles) => articles.is_empty(),
            AreaFeed::External(stories) => stories.is_empty(),
        }
    }
}

pub struct AreaFeedService {
    store: Arc<dyn NewsStore>,
    external: Arc<dyn ExternalNews>,
    external_limit: usize,
}

impl AreaFeedService {
    pub fn new(store: Arc<dyn NewsStore>, external: Arc<dyn ExternalNews>) -> Self {
        Self {
            store,
            external,
            external_limit: DEFAULT_EXTERNAL_LIMIT,
        }
    }

    pub fn with_external_limit(mut self, limit: usize) -> Self {
        self.external_limit = limit;
        self
    }

    pub async fn for_area(&self, area_name: &str) -> Result<AreaFeed> {
        let name = normalize_area_name(area_name);
        if name.is_empty() {
            return Err(NewsError::InvalidAreaName);
        }

        if let Some(area) = self.store.find_area_by_name(&name).await? {
            let articles = self.store.find_articles(area.id).await?;
            if !articles.is_empty() {
                debug!("Area '{}' has {} local articles", name, articles.len());
                return Ok(AreaFeed::Local(articles));
            }
        }

        info!("No local articles for '{}', using outside news", name);
        match self.external.stories_for_area(&name, self.external_limit).await {
            Ok(stories) => Ok(AreaFeed::External(stories)),
            Err(e) => {
                warn!("Outside news lookup failed for '{}': {}", name, e);
                Ok(AreaFeed::External(Vec::new()))
            }
        }
    }

    /// Article of `area_name` whose title slugifies to `slug`.
    pub async fn article_by_slug(&self, area_name: &str, slug: &str) -> Result<Option<Article>> {
        let name = normalize_area_name(area_name);
        let Some(area) = self.store.find_area_by_name(&name).await? else {
            return Err(NewsError::AreaNotFound { name });
        };

        let slug = slug.trim_matches('/').to_lowercase();
        Ok(self
            .store
            .find_articles(area.id)
            .await?
            .into_iter()
            .find(|article| slugify(&article.title) == slug))
    }
}
