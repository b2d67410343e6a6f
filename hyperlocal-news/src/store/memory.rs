use super::{NewsStore, MAX_CATEGORY_TEXT, MAX_SHORT_TEXT};
use crate::types::{
    AdCategory, Advertisement, Area, Article, NewAdvertisement, NewArticle, NewPost, NewsError,
    PageView, Post, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    areas: Vec<Area>,
    posts: Vec<Post>,
    articles: Vec<Article>,
    advertisements: Vec<Advertisement>,
    page_views: HashMap<String, PageView>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store with the same ordering and constraint behavior as the
/// Postgres schema. Used by tests and offline runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_length(column: &str, value: &str) -> Result<()> {
    check_max_length(column, value, MAX_SHORT_TEXT)
}

fn check_max_length(column: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(NewsError::General(format!(
            "value too long for column {} ({} > {})",
            column, len, max
        )));
    }
    Ok(())
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn find_area_by_name(&self, name: &str) -> Result<Option<Area>> {
        let tables = self.tables.read().await;
        Ok(tables.areas.iter().find(|a| a.name == name).cloned())
    }

    async fn get_area(&self, area_id: i64) -> Result<Option<Area>> {
        let tables = self.tables.read().await;
        Ok(tables.areas.iter().find(|a| a.id == area_id).cloned())
    }

    async fn list_areas(&self) -> Result<Vec<Area>> {
        let tables = self.tables.read().await;
        Ok(tables.areas.clone())
    }

    async fn get_or_create_area(&self, name: &str) -> Result<(Area, bool)> {
        check_length("areas.name", name)?;
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.areas.iter().find(|a| a.name == name) {
            return Ok((existing.clone(), false));
        }

        let area = Area {
            id: tables.next_id(),
            name: name.to_string(),
            last_generated_at: None,
            latitude: None,
            longitude: None,
            created_at: Utc::now(),
        };
        tables.areas.push(area.clone());
        debug!("Created area '{}' (ID: {})", area.name, area.id);
        Ok((area, true))
    }

    async fn set_area_location(&self, area_id: i64, latitude: f64, longitude: f64) -> Result<()> {
        let mut tables = self.tables.write().await;
        let area = tables
            .areas
            .iter_mut()
            .find(|a| a.id == area_id)
            .ok_or_else(|| NewsError::AreaNotFound { name: format!("id {}", area_id) })?;
        area.latitude = Some(latitude);
        area.longitude = Some(longitude);
        Ok(())
    }

    async fn set_last_generated_at(&self, area_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let area = tables
            .areas
            .iter_mut()
            .find(|a| a.id == area_id)
            .ok_or_else(|| NewsError::AreaNotFound { name: format!("id {}", area_id) })?;
        area.last_generated_at = Some(match area.last_generated_at {
            Some(current) if current > at => current,
            _ => at,
        });
        Ok(())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        if let Some(name) = &post.reporter_name {
            check_length("posts.reporter_name", name)?;
        }
        let mut tables = self.tables.write().await;
        if !tables.areas.iter().any(|a| a.id == post.area_id) {
            return Err(NewsError::AreaNotFound { name: format!("id {}", post.area_id) });
        }

        let stored = Post {
            id: tables.next_id(),
            area_id: post.area_id,
            content: post.content,
            reporter_name: post.reporter_name,
            created_at: post.posted_at.unwrap_or_else(Utc::now),
        };
        tables.posts.push(stored.clone());
        Ok(stored)
    }

    async fn find_posts(&self, area_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| p.area_id == area_id)
            .filter(|p| since.map_or(true, |watermark| p.created_at > watermark))
            .cloned()
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        check_length("articles.title", &article.title)?;
        check_max_length("articles.category", &article.category, MAX_CATEGORY_TEXT)?;
        if let Some(name) = &article.reporter_name {
            check_length("articles.reporter_name", name)?;
        }
        let mut tables = self.tables.write().await;
        if !tables.areas.iter().any(|a| a.id == article.area_id) {
            return Err(NewsError::AreaNotFound { name: format!("id {}", article.area_id) });
        }

        let stored = Article {
            id: tables.next_id(),
            area_id: article.area_id,
            title: article.title,
            content: article.content,
            category: article.category,
            cover_image: article.cover_image,
            reporter_name: article.reporter_name,
            likes: 0,
            created_at: Utc::now(),
        };
        tables.articles.push(stored.clone());
        Ok(stored)
    }

    async fn find_articles(&self, area_id: i64) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        let mut articles: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| a.area_id == area_id)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.clone())
    }

    async fn get_article(&self, article_id: i64) -> Result<Option<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.id == article_id).cloned())
    }

    async fn update_cover_image(&self, article_id: i64, cover_image: Option<&str>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let article = tables
            .articles
            .iter_mut()
            .find(|a| a.id == article_id)
            .ok_or(NewsError::ArticleNotFound { id: article_id })?;
        article.cover_image = cover_image.map(|s| s.to_string());
        Ok(())
    }

    async fn like_article(&self, article_id: i64) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let article = tables
            .articles
            .iter_mut()
            .find(|a| a.id == article_id)
            .ok_or(NewsError::ArticleNotFound { id: article_id })?;
        article.likes += 1;
        Ok(article.likes)
    }

    async fn create_advertisement(&self, ad: NewAdvertisement) -> Result<Advertisement> {
        if let Some(name) = &ad.advertiser_name {
            check_length("advertisements.advertiser_name", name)?;
        }
        let mut tables = self.tables.write().await;
        if !tables.areas.iter().any(|a| a.id == ad.area_id) {
            return Err(NewsError::AreaNotFound { name: format!("id {}", ad.area_id) });
        }

        let stored = Advertisement {
            id: tables.next_id(),
            area_id: ad.area_id,
            content: ad.content,
            advertiser_name: ad.advertiser_name,
            category: ad.category,
            created_at: Utc::now(),
        };
        tables.advertisements.push(stored.clone());
        Ok(stored)
    }

    async fn list_advertisements(&self, area_id: Option<i64>) -> Result<Vec<Advertisement>> {
        let tables = self.tables.read().await;
        Ok(tables
            .advertisements
            .iter()
            .filter(|ad| area_id.map_or(true, |id| ad.area_id == id))
            .cloned()
            .collect())
    }

    async fn update_advertisement_category(&self, ad_id: i64, category: AdCategory) -> Result<()> {
        let mut tables = self.tables.write().await;
        let ad = tables
            .advertisements
            .iter_mut()
            .find(|ad| ad.id == ad_id)
            .ok_or_else(|| NewsError::General(format!("Advertisement not found: {}", ad_id)))?;
        ad.category = category;
        Ok(())
    }

    async fn record_page_view(&self, path: &str, is_article: bool) -> Result<PageView> {
        check_length("page_views.path", path)?;
        let mut tables = self.tables.write().await;
        let view = tables
            .page_views
            .entry(path.to_string())
            .or_insert_with(|| PageView {
                path: path.to_string(),
                visits: 0,
                is_article: false,
                created_at: Utc::now(),
            });
        view.visits += 1;
        view.is_article |= is_article;
        Ok(view.clone())
    }

    async fn top_article_views(&self, limit: usize) -> Result<Vec<PageView>> {
        let tables = self.tables.read().await;
        let mut views: Vec<PageView> = tables
            .page_views
            .values()
            .filter(|v| v.is_article)
            .cloned()
            .collect();
        views.sort_by(|a, b| b.visits.cmp(&a.visits).then(a.path.cmp(&b.path)));
        views.truncate(limit);
        Ok(views)
    }
}
