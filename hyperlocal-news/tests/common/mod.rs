#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hyperlocal_news::{
    AdCategory, Advertisement, Area, Article, ImageSearch, MemoryStore, NewAdvertisement, NewArticle,
    NewPost, NewsError, NewsStore, PageView, Post, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Image search double that records every query and answers from a fixed script.
pub struct RecordingImageSearch {
    pub answer: Option<String>,
    pub fail: bool,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingImageSearch {
    pub fn returning(url: &str) -> Self {
        Self {
            answer: Some(url.to_string()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            answer: None,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSearch for RecordingImageSearch {
    async fn search(&self, query: &str, category: Option<&str>) -> Result<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), category.map(String::from)));
        if self.fail {
            return Err(NewsError::collaborator("images", "service unavailable"));
        }
        Ok(self.answer.clone())
    }
}

pub async fn area(store: &MemoryStore, name: &str) -> Area {
    store.get_or_create_area(name).await.unwrap().0
}

/// Store a post `minutes_ago` minutes in the past.
pub async fn post(store: &MemoryStore, area: &Area, content: &str, reporter: Option<&str>, minutes_ago: i64) -> Post {
    store
        .create_post(NewPost {
            area_id: area.id,
            content: content.to_string(),
            reporter_name: reporter.map(String::from),
            posted_at: Some(Utc::now() - Duration::minutes(minutes_ago)),
        })
        .await
        .unwrap()
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Memory store whose post reads can be switched to fail.
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_post_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_post_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_post_reads(&self, fail: bool) {
        self.fail_post_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NewsStore for FlakyStore {
    async fn find_area_by_name(&self, name: &str) -> Result<Option<Area>> {
        self.inner.find_area_by_name(name).await
    }

    async fn get_area(&self, area_id: i64) -> Result<Option<Area>> {
        self.inner.get_area(area_id).await
    }

    async fn list_areas(&self) -> Result<Vec<Area>> {
        self.inner.list_areas().await
    }

    async fn get_or_create_area(&self, name: &str) -> Result<(Area, bool)> {
        self.inner.get_or_create_area(name).await
    }

    async fn set_area_location(&self, area_id: i64, latitude: f64, longitude: f64) -> Result<()> {
        self.inner.set_area_location(area_id, latitude, longitude).await
    }

    async fn set_last_generated_at(&self, area_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.inner.set_last_generated_at(area_id, at).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.inner.create_post(post).await
    }

    async fn find_posts(&self, area_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Post>> {
        if self.fail_post_reads.load(Ordering::SeqCst) {
            return Err(NewsError::General("connection reset".to_string()));
        }
        self.inner.find_posts(area_id, since).await
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        self.inner.create_article(article).await
    }

    async fn find_articles(&self, area_id: i64) -> Result<Vec<Article>> {
        self.inner.find_articles(area_id).await
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.inner.list_articles().await
    }

    async fn get_article(&self, article_id: i64) -> Result<Option<Article>> {
        self.inner.get_article(article_id).await
    }

    async fn update_cover_image(&self, article_id: i64, cover_image: Option<&str>) -> Result<()> {
        self.inner.update_cover_image(article_id, cover_image).await
    }

    async fn like_article(&self, article_id: i64) -> Result<i64> {
        self.inner.like_article(article_id).await
    }

    async fn create_advertisement(&self, ad: NewAdvertisement) -> Result<Advertisement> {
        self.inner.create_advertisement(ad).await
    }

    async fn list_advertisements(&self, area_id: Option<i64>) -> Result<Vec<Advertisement>> {
        self.inner.list_advertisements(area_id).await
    }

    async fn update_advertisement_category(&self, ad_id: i64, category: AdCategory) -> Result<()> {
        self.inner.update_advertisement_category(ad_id, category).await
    }

    async fn record_page_view(&self, path: &str, is_article: bool) -> Result<PageView> {
        self.inner.record_page_view(path, is_article).await
    }

    async fn top_article_views(&self, limit: usize) -> Result<Vec<PageView>> {
        self.inner.top_article_views(limit).await
    }
}
