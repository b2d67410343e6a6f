use crate::store::NewsStore;
use crate::types::{Article, NewsError, PageView, Result};
use std::sync::Arc;
use tracing::{debug, warn};

const EXCLUDED_PREFIXES: &[&str] = &["upload/", "news/", "post/", "generate-news/", "autocomplete/", "favicon.ico"];
const ARTICLE_PREFIX: &str = "article/";

/// Normalized path to count for a request, or `None` when it is not tracked.
pub fn tracked_path(method: &str, path: &str) -> Option<String> {
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    let path = path.trim_matches('/');
    if path.is_empty() || EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return None;
    }
    Some(path.to_string())
}

/// Article id encoded in an `article/<id>` path.
pub fn article_id_from_path(path: &str) -> Option<i64> {
    path.strip_prefix(ARTICLE_PREFIX)?
        .split('/')
        .next()?
        .parse()
        .ok()
}

pub struct PageViewTracker {
    store: Arc<dyn NewsStore>,
}

impl PageViewTracker {
    pub fn new(store: Arc<dyn NewsStore>) -> Self {
        Self { store }
    }

    /// Count one visit. Returns the updated counter, or `None` for untracked requests.
    pub async fn track(&self, method: &str, path: &str) -> Result<Option<PageView>> {
        let Some(path) = tracked_path(method, path) else {
            return Ok(None);
        };
        let is_article = path.starts_with(ARTICLE_PREFIX);
        let view = self.store.record_page_view(&path, is_article).await?;
        debug!("Page view {} -> {} visits", view.path, view.visits);
        Ok(Some(view))
    }

    /// Most viewed articles first, up to `limit`. Views pointing at deleted
    /// articles or unparseable paths are passed over and the next ones fill in.
    pub async fn trending_articles(&self, limit: usize) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> = Vec::with_capacity(limit);
        if limit == 0 {
            return Ok(articles);
        }

        let mut fetch = limit;
        let mut seen = 0;
        loop {
            let views = self.store.top_article_views(fetch).await?;
            let exhausted = views.len() < fetch;

            for view in views.iter().skip(seen) {
                let Some(id) = article_id_from_path(&view.path) else {
                    warn!("Unparseable article path '{}'", view.path);
                    continue;
                };
                if articles.iter().any(|a| a.id == id) {
                    continue;
                }
                if let Some(article) = self.store.get_article(id).await? {
                    articles.push(article);
                    if articles.len() == limit {
                        return Ok(articles);
                    }
                }
            }

            if exhausted {
                return Ok(articles);
            }
            seen = views.len();
            fetch = fetch.saturating_mul(2);
        }
    }

    pub async fn like_article(&self, article_id: i64) -> Result<i64> {
        if self.store.get_article(article_id).await?.is_none() {
            return Err(NewsError::ArticleNotFound { id: article_id });
        }
        self.store.like_article(article_id).await
    }
}
