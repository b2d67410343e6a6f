//! Persistence for areas, posts, articles, advertisements and page views.
//!
//! Relationships are never traversed implicitly: callers ask for
//! `find_posts(area_id, since)` or `find_articles(area_id)` explicitly.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgNewsStore;

use crate::types::{
    AdCategory, Advertisement, Area, Article, NewAdvertisement, NewArticle, NewPost, PageView,
    Post, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Column limit shared by both stores for titles, names and paths.
pub const MAX_SHORT_TEXT: usize = 255;

/// `articles.category` limit.
pub const MAX_CATEGORY_TEXT: usize = 100;

#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn find_area_by_name(&self, name: &str) -> Result<Option<Area>>;

    async fn get_area(&self, area_id: i64) -> Result<Option<Area>>;

    /// All areas in creation (id) order.
    async fn list_areas(&self) -> Result<Vec<Area>>;

    /// Returns the area and whether it was created by this call.
    async fn get_or_create_area(&self, name: &str) -> Result<(Area, bool)>;

    async fn set_area_location(&self, area_id: i64, latitude: f64, longitude: f64) -> Result<()>;

    /// Advance the generation watermark. A value older than the stored one
    /// leaves the watermark untouched.
    async fn set_last_generated_at(&self, area_id: i64, at: DateTime<Utc>) -> Result<()>;

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Posts of an area created strictly after `since` (all posts when `None`),
    /// oldest first.
    async fn find_posts(&self, area_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Post>>;

    async fn create_article(&self, article: NewArticle) -> Result<Article>;

    /// Articles of an area, newest first.
    async fn find_articles(&self, area_id: i64) -> Result<Vec<Article>>;

    /// Every article in id order.
    async fn list_articles(&self) -> Result<Vec<Article>>;

    async fn get_article(&self, article_id: i64) -> Result<Option<Article>>;

    async fn update_cover_image(&self, article_id: i64, cover_image: Option<&str>) -> Result<()>;

    /// Increment the like counter and return the new value.
    async fn like_article(&self, article_id: i64) -> Result<i64>;

    async fn create_advertisement(&self, ad: NewAdvertisement) -> Result<Advertisement>;

    /// Advertisements in id order, optionally restricted to one area.
    async fn list_advertisements(&self, area_id: Option<i64>) -> Result<Vec<Advertisement>>;

    async fn update_advertisement_category(&self, ad_id: i64, category: AdCategory) -> Result<()>;

    /// Get-or-create the counter for `path` and add one visit.
    async fn record_page_view(&self, path: &str, is_article: bool) -> Result<PageView>;

    /// Article page views, most visited first.
    async fn top_article_views(&self, limit: usize) -> Result<Vec<PageView>>;
}
