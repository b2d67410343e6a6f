pub mod types;
pub mod traits;
pub mod utils;
pub mod retry;
pub mod store;
pub mod area_resolver;
pub mod llm_adapter;
pub mod image_search;
pub mod fetcher;
pub mod parser;
pub mod rss_fallback;
pub mod pipeline;
pub mod advertisements;
pub mod posts;
pub mod page_views;
pub mod area_feed;
pub mod locations;
pub mod config;

pub use types::*;
pub use traits::{ExternalNews, ImageSearch, LlmAdapter};
pub use retry::RetryPolicy;
pub use store::{MemoryStore, NewsStore, PgNewsStore};
pub use area_resolver::{AreaResolver, Resolution, ResolveStatus};
pub use llm_adapter::{GeminiAdapter, MockLlmAdapter, MockReply, UnconfiguredLlm};
pub use image_search::{CachedImageSearch, ImageCache, NoImageSearch, UnsplashImageSearch};
pub use fetcher::Fetcher;
pub use rss_fallback::{NoExternalNews, RssNewsFeed};
pub use pipeline::{
    CoverImageReport, GenerationOutcome, NewsGenerationPipeline, RegenerateOptions, RegenerationReport,
};
pub use advertisements::{AdBoard, AdClassifier, ReclassifyOptions, ReclassifyReport};
pub use posts::submit_post;
pub use page_views::PageViewTracker;
pub use area_feed::{AreaFeed, AreaFeedService};
pub use config::{AppConfig, AppContext};
