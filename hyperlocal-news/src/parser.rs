use crate::types::{ExternalStory, NewsError, Result};
use chrono::Utc;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

/// Parse an RSS/Atom document into stories, dropping entries without a link
/// and repeated links. At most `limit` stories are returned.
pub fn parse_stories(content: &str, limit: usize) -> Result<Vec<ExternalStory>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| NewsError::Parse(format!("Failed to parse feed: {}", e)))?;

    let mut seen_urls = HashSet::new();
    let mut stories = Vec::new();

    for entry in feed.entries {
        if stories.len() >= limit {
            break;
        }

        let Some(url) = entry.links.first().map(|l| l.href.clone()) else {
            debug!("Skipping feed entry without a link");
            continue;
        };
        if !seen_urls.insert(url.clone()) {
            debug!("Skipping duplicate entry with URL: {}", url);
            continue;
        }

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        stories.push(ExternalStory {
            title,
            url,
            summary: entry.summary.map(|s| s.content),
            source: entry.authors.first().map(|a| a.name.clone()),
            published_at: entry.published.or(entry.updated).map(|dt| dt.with_timezone(&Utc)),
        });
    }

    info!("Parsed feed with {} stories", stories.len());
    Ok(stories)
}

/// Basic check that content looks like an RSS/Atom document.
pub fn is_valid_feed_content(content: &str) -> bool {
    let content_lower = content.to_lowercase();
    content_lower.contains("<rss")
        || content_lower.contains("<feed")
        || content_lower.contains("<channel")
}
