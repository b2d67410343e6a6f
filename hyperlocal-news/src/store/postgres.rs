use super::NewsStore;
use crate::types::{
    AdCategory, Advertisement, Area, Article, NewAdvertisement, NewArticle, NewPost, NewsError,
    PageView, Post, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Pool, Postgres, Row};
use tracing::{debug, info, warn};

const AREA_COLUMNS: &str = "id, name, last_generated_at, latitude, longitude, created_at";
const POST_COLUMNS: &str = "id, area_id, content, reporter_name, created_at";
const ARTICLE_COLUMNS: &str =
    "id, area_id, title, content, category, cover_image, reporter_name, likes, created_at";
const AD_COLUMNS: &str = "id, area_id, content, advertiser_name, category, created_at";

pub struct PgNewsStore {
    db: Pool<Postgres>,
}

impl PgNewsStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    pub fn get_db_pool(&self) -> &Pool<Postgres> {
        &self.db
    }
}

fn area_from_row(row: &PgRow) -> Result<Area> {
    Ok(Area {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        last_generated_at: row.try_get("last_generated_at")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        created_at: row.try_get("created_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        area_id: row.try_get("area_id")?,
        content: row.try_get("content")?,
        reporter_name: row.try_get("reporter_name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        area_id: row.try_get("area_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        cover_image: row.try_get("cover_image")?,
        reporter_name: row.try_get("reporter_name")?,
        likes: row.try_get("likes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn advertisement_from_row(row: &PgRow) -> Result<Advertisement> {
    let id: i64 = row.try_get("id")?;
    let label: String = row.try_get("category")?;
    let category = AdCategory::from_label(&label).unwrap_or_else(|| {
        warn!("Advertisement {} has unknown category '{}', reading as community", id, label);
        AdCategory::Community
    });

    Ok(Advertisement {
        id,
        area_id: row.try_get("area_id")?,
        content: row.try_get("content")?,
        advertiser_name: row.try_get("advertiser_name")?,
        category,
        created_at: row.try_get("created_at")?,
    })
}

fn page_view_from_row(row: &PgRow) -> Result<PageView> {
    Ok(PageView {
        path: row.try_get("path")?,
        visits: row.try_get("visits")?,
        is_article: row.try_get("is_article")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl NewsStore for PgNewsStore {
    async fn find_area_by_name(&self, name: &str) -> Result<Option<Area>> {
        let row = sqlx::query(&format!("SELECT {} FROM areas WHERE name = $1", AREA_COLUMNS))
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(area_from_row).transpose()
    }

    async fn get_area(&self, area_id: i64) -> Result<Option<Area>> {
        let row = sqlx::query(&format!("SELECT {} FROM areas WHERE id = $1", AREA_COLUMNS))
            .bind(area_id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(area_from_row).transpose()
    }

    async fn list_areas(&self) -> Result<Vec<Area>> {
        let rows = sqlx::query(&format!("SELECT {} FROM areas ORDER BY id", AREA_COLUMNS))
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(area_from_row).collect()
    }

    async fn get_or_create_area(&self, name: &str) -> Result<(Area, bool)> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO areas (name, created_at)
            VALUES ($1, NOW())
            ON CONFLICT (name) DO NOTHING
            RETURNING {}
            "#,
            AREA_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            let area = area_from_row(&row)?;
            info!("Added new area: '{}' with ID: {}", area.name, area.id);
            return Ok((area, true));
        }

        // Lost the insert race or the row already existed
        match self.find_area_by_name(name).await? {
            Some(area) => Ok((area, false)),
            None => Err(NewsError::AreaNotFound { name: name.to_string() }),
        }
    }

    async fn set_area_location(&self, area_id: i64, latitude: f64, longitude: f64) -> Result<()> {
        let result = sqlx::query("UPDATE areas SET latitude = $1, longitude = $2 WHERE id = $3")
            .bind(latitude)
            .bind(longitude)
            .bind(area_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NewsError::AreaNotFound { name: format!("id {}", area_id) });
        }
        Ok(())
    }

    async fn set_last_generated_at(&self, area_id: i64, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE areas
            SET last_generated_at = GREATEST(COALESCE(last_generated_at, $1), $1)
            WHERE id = $2
            "#,
        )
        .bind(at)
        .bind(area_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NewsError::AreaNotFound { name: format!("id {}", area_id) });
        }
        debug!("Area {} watermark set to {}", area_id, at);
        Ok(())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        // Stamped with the application clock, the same one the pipeline's
        // watermark comes from.
        let created_at = post.posted_at.unwrap_or_else(Utc::now);
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO posts (area_id, content, reporter_name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post.area_id)
        .bind(&post.content)
        .bind(&post.reporter_name)
        .bind(created_at)
        .fetch_one(&self.db)
        .await?;

        post_from_row(&row)
    }

    async fn find_posts(&self, area_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM posts
            WHERE area_id = $1 AND ($2::timestamptz IS NULL OR created_at > $2)
            ORDER BY created_at, id
            "#,
            POST_COLUMNS
        ))
        .bind(area_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(post_from_row).collect()
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO articles (area_id, title, content, category, cover_image, reporter_name, likes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, NOW())
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        ))
        .bind(article.area_id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.category)
        .bind(&article.cover_image)
        .bind(&article.reporter_name)
        .fetch_one(&self.db)
        .await?;

        article_from_row(&row)
    }

    async fn find_articles(&self, area_id: i64) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE area_id = $1 ORDER BY created_at DESC, id DESC",
            ARTICLE_COLUMNS
        ))
        .bind(area_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(article_from_row).collect()
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!("SELECT {} FROM articles ORDER BY id", ARTICLE_COLUMNS))
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(article_from_row).collect()
    }

    async fn get_article(&self, article_id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS))
            .bind(article_id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn update_cover_image(&self, article_id: i64, cover_image: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE articles SET cover_image = $1 WHERE id = $2")
            .bind(cover_image)
            .bind(article_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NewsError::ArticleNotFound { id: article_id });
        }
        Ok(())
    }

    async fn like_article(&self, article_id: i64) -> Result<i64> {
        let likes: Option<i64> =
            sqlx::query_scalar("UPDATE articles SET likes = likes + 1 WHERE id = $1 RETURNING likes")
                .bind(article_id)
                .fetch_optional(&self.db)
                .await?;

        likes.ok_or(NewsError::ArticleNotFound { id: article_id })
    }

    async fn create_advertisement(&self, ad: NewAdvertisement) -> Result<Advertisement> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO advertisements (area_id, content, advertiser_name, category, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {}
            "#,
            AD_COLUMNS
        ))
        .bind(ad.area_id)
        .bind(&ad.content)
        .bind(&ad.advertiser_name)
        .bind(ad.category.as_str())
        .fetch_one(&self.db)
        .await?;

        advertisement_from_row(&row)
    }

    async fn list_advertisements(&self, area_id: Option<i64>) -> Result<Vec<Advertisement>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM advertisements
            WHERE ($1::bigint IS NULL OR area_id = $1)
            ORDER BY id
            "#,
            AD_COLUMNS
        ))
        .bind(area_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(advertisement_from_row).collect()
    }

    async fn update_advertisement_category(&self, ad_id: i64, category: AdCategory) -> Result<()> {
        let result = sqlx::query("UPDATE advertisements SET category = $1 WHERE id = $2")
            .bind(category.as_str())
            .bind(ad_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NewsError::General(format!("Advertisement not found: {}", ad_id)));
        }
        Ok(())
    }

    async fn record_page_view(&self, path: &str, is_article: bool) -> Result<PageView> {
        let row = sqlx::query(
            r#"
            INSERT INTO page_views (path, visits, is_article, created_at)
            VALUES ($1, 1, $2, NOW())
            ON CONFLICT (path) DO UPDATE SET
                visits = page_views.visits + 1,
                is_article = page_views.is_article OR EXCLUDED.is_article
            RETURNING path, visits, is_article, created_at
            "#,
        )
        .bind(path)
        .bind(is_article)
        .fetch_one(&self.db)
        .await?;

        page_view_from_row(&row)
    }

    async fn top_article_views(&self, limit: usize) -> Result<Vec<PageView>> {
        let rows = sqlx::query(
            r#"
            SELECT path, visits, is_article, created_at
            FROM page_views
            WHERE is_article = true
            ORDER BY visits DESC, path
            LIMIT $1
            "#,
        )
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(page_view_from_row).collect()
    }
}
