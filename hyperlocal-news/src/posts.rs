use crate::area_resolver::{AreaResolver, Resolution};
use crate::store::NewsStore;
use crate::types::{NewPost, NewsError, Post, Result};
use std::sync::Arc;
use tracing::info;

/// Store a resident's post under the resolved area. The resolution is
/// returned so callers can show a "did you mean" hint for `Suggested`.
pub async fn submit_post(
    store: Arc<dyn NewsStore>,
    raw_area: &str,
    content: &str,
    reporter_name: Option<&str>,
) -> Result<(Post, Resolution)> {
    let content = content.trim();
    if content.is_empty() {
        return Err(NewsError::General("post content is empty".to_string()));
    }

    let resolution = AreaResolver::new(store.clone()).resolve(raw_area).await?;
    let post = store
        .create_post(NewPost {
            area_id: resolution.area.id,
            content: content.to_string(),
            reporter_name: reporter_name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
            posted_at: None,
        })
        .await?;

    info!("Stored post {} in area '{}' ({:?})", post.id, resolution.area.name, resolution.status);
    Ok((post, resolution))
}
