use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named geography bucket. `name` is always stored normalized
/// (lowercase, trimmed, single spaces).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: i64,
    pub name: String,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Area {
    pub fn is_mapped(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub area_id: i64,
    pub content: String,
    pub reporter_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub area_id: i64,
    pub content: String,
    pub reporter_name: Option<String>,
    // None means "now"
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub area_id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub cover_image: Option<String>,
    pub reporter_name: Option<String>,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub area_id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub cover_image: Option<String>,
    pub reporter_name: Option<String>,
}

/// Classified-ad buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdCategory {
    Jobs,
    Housing,
    ForSale,
    Services,
    Community,
    Gigs,
    Resumes,
}

impl AdCategory {
    pub const ALL: [AdCategory; 7] = [
        AdCategory::Jobs,
        AdCategory::Housing,
        AdCategory::ForSale,
        AdCategory::Services,
        AdCategory::Community,
        AdCategory::Gigs,
        AdCategory::Resumes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdCategory::Jobs => "jobs",
            AdCategory::Housing => "housing",
            AdCategory::ForSale => "for-sale",
            AdCategory::Services => "services",
            AdCategory::Community => "community",
            AdCategory::Gigs => "gigs",
            AdCategory::Resumes => "resumes",
        }
    }

    /// Lenient label parsing: accepts "For Sale", "for_sale", "Jobs.", "job", ...
    pub fn from_label(label: &str) -> Option<Self> {
        let cleaned: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let cleaned = cleaned.trim_matches('-');

        match cleaned {
            "jobs" | "job" => Some(AdCategory::Jobs),
            "housing" | "house" | "rental" | "rentals" => Some(AdCategory::Housing),
            "for-sale" | "forsale" | "sale" => Some(AdCategory::ForSale),
            "services" | "service" => Some(AdCategory::Services),
            "community" => Some(AdCategory::Community),
            "gigs" | "gig" => Some(AdCategory::Gigs),
            "resumes" | "resume" => Some(AdCategory::Resumes),
            _ => None,
        }
    }
}

impl fmt::Display for AdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    pub id: i64,
    pub area_id: i64,
    pub content: String,
    pub advertiser_name: Option<String>,
    pub category: AdCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub area_id: i64,
    pub content: String,
    pub advertiser_name: Option<String>,
    pub category: AdCategory,
}

/// Visit counter for a tracked path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub path: String,
    pub visits: i64,
    pub is_article: bool,
    pub created_at: DateTime<Utc>,
}

// Ownership note:
// Areas own their posts, articles and advertisements. Records are created
// through the store with the `New*` shapes and come back with ids and
// timestamps assigned. Posts are never mutated after creation.
