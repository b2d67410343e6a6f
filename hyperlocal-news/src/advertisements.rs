use crate::area_resolver::{AreaResolver, Resolution};
use crate::store::NewsStore;
use crate::traits::LlmAdapter;
use crate::types::{AdCategory, Advertisement, NewAdvertisement, NewsError, Result};
use crate::utils::normalize_area_name;
use crate::utils::text::truncate_for_log;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const KEYWORDS: &[(AdCategory, &[&str])] = &[
    (
        AdCategory::Jobs,
        &["hiring", "job", "jobs", "position", "vacancy", "employer", "salary", "apply", "full time", "part time", "career", "staff"],
    ),
    (
        AdCategory::Housing,
        &["apartment", "rent", "rental", "bedroom", "lease", "sublet", "roommate", "room", "house", "condo", "studio"],
    ),
    (
        AdCategory::ForSale,
        &["for sale", "sale", "selling", "sell", "best offer", "obo", "used", "condition", "original box"],
    ),
    (
        AdCategory::Services,
        &["service", "services", "repair", "tutoring", "cleaning", "plumbing", "lessons", "rates", "professional", "installation"],
    ),
    (
        AdCategory::Community,
        &["community", "club", "meeting", "meets", "volunteer", "event", "group", "welcome", "festival", "neighbors"],
    ),
    (
        AdCategory::Gigs,
        &["freelance", "gig", "gigs", "odd job", "one time", "help moving", "temporary", "side work"],
    ),
    (
        AdCategory::Resumes,
        &["resume", "cv", "seeking", "experienced", "years experience", "looking for work", "opportunities", "available for hire"],
    ),
];

/// Deterministic keyword scoring. Ties and content without any signal land
/// in `Community`.
pub fn keyword_category(content: &str) -> AdCategory {
    let haystack = padded_words(content);
    let mut best = AdCategory::Community;
    let mut best_score = 0;
    let mut tied = false;

    for (category, words) in KEYWORDS {
        let score: usize = words
            .iter()
            .map(|word| haystack.matches(&padded_words(word)).count())
            .sum();
        if score > best_score {
            best = *category;
            best_score = score;
            tied = false;
        } else if score == best_score && score > 0 {
            tied = true;
        }
    }

    if best_score == 0 || tied {
        AdCategory::Community
    } else {
        best
    }
}

// " word word " with punctuation flattened, so phrases match on word boundaries
fn padded_words(text: &str) -> String {
    let words: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", words.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Classifies ads with the text generator, falling back to keyword scoring
/// when it fails or answers with a label outside [`AdCategory`].
pub struct AdClassifier {
    llm: Option<Arc<dyn LlmAdapter>>,
}

impl AdClassifier {
    pub fn new(llm: Arc<dyn LlmAdapter>) -> Self {
        Self { llm: Some(llm) }
    }

    pub fn keywords_only() -> Self {
        Self { llm: None }
    }

    pub async fn categorize(&self, content: &str) -> AdCategory {
        let Some(llm) = &self.llm else {
            return keyword_category(content);
        };

        match llm.categorize_advertisement(content).await {
            Ok(label) => match AdCategory::from_label(&label) {
                Some(category) => {
                    debug!("{} labelled ad as {}", llm.adapter_name(), category);
                    category
                }
                None => {
                    warn!("Unknown ad label '{}', using keyword scoring", truncate_for_log(&label, 40));
                    keyword_category(content)
                }
            },
            Err(e) => {
                warn!("Ad categorization failed, using keyword scoring: {}", e);
                keyword_category(content)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReclassifyOptions {
    /// Only ads of this area (matched case-insensitively).
    pub area: Option<String>,
    pub batch_size: usize,
    pub delay: Duration,
    pub dry_run: bool,
}

impl Default for ReclassifyOptions {
    fn default() -> Self {
        Self {
            area: None,
            batch_size: 10,
            delay: Duration::from_secs(1),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclassifyReport {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Classified ads: submission and bulk re-classification.
pub struct AdBoard {
    store: Arc<dyn NewsStore>,
    classifier: AdClassifier,
}

impl AdBoard {
    pub fn new(store: Arc<dyn NewsStore>, classifier: AdClassifier) -> Self {
        Self { store, classifier }
    }

    pub async fn submit_advertisement(
        &self,
        raw_area: &str,
        content: &str,
        advertiser_name: Option<&str>,
    ) -> Result<(Advertisement, Resolution)> {
        let content = content.trim();
        if content.is_empty() {
            return Err(NewsError::General("advertisement content is empty".to_string()));
        }

        let resolution = AreaResolver::new(self.store.clone()).resolve(raw_area).await?;
        let category = self.classifier.categorize(content).await;

        let ad = self
            .store
            .create_advertisement(NewAdvertisement {
                area_id: resolution.area.id,
                content: content.to_string(),
                advertiser_name: advertiser_name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
                category,
            })
            .await?;

        info!("Stored advertisement {} in area '{}' as {}", ad.id, resolution.area.name, category);
        Ok((ad, resolution))
    }

    pub async fn reclassify(&self, options: &ReclassifyOptions) -> Result<ReclassifyReport> {
        let area_id = match &options.area {
            Some(name) => match self.store.find_area_by_name(&normalize_area_name(name)).await? {
                Some(area) => Some(area.id),
                None => {
                    warn!("No advertisements found in area \"{}\"", name);
                    return Ok(ReclassifyReport::default());
                }
            },
            None => None,
        };

        let ads = self.store.list_advertisements(area_id).await?;
        let mut report = ReclassifyReport::default();
        if ads.is_empty() {
            warn!("No advertisements found to reclassify");
            return Ok(report);
        }

        info!("Found {} advertisements to reclassify", ads.len());
        if options.dry_run {
            warn!("Dry run, no changes will be saved");
        }

        let batch_size = options.batch_size.max(1);
        for (batch_index, batch) in ads.chunks(batch_size).enumerate() {
            let first = batch_index * batch_size + 1;
            info!(
                "Processing batch {} (advertisements {}-{} of {})",
                batch_index + 1,
                first,
                first + batch.len() - 1,
                ads.len()
            );

            for ad in batch {
                let new_category = self.classifier.categorize(&ad.content).await;
                report.processed += 1;

                if new_category == ad.category {
                    debug!("Advertisement {}: no change needed ({})", ad.id, ad.category);
                    report.unchanged += 1;
                } else if options.dry_run {
                    info!("Advertisement {}: {} -> {} (dry run)", ad.id, ad.category, new_category);
                    report.updated += 1;
                } else {
                    match self.store.update_advertisement_category(ad.id, new_category).await {
                        Ok(()) => {
                            info!("Advertisement {}: {} -> {}", ad.id, ad.category, new_category);
                            report.updated += 1;
                        }
                        Err(e) => {
                            error!("Error processing advertisement {}: {}", ad.id, e);
                            report.errors += 1;
                        }
                    }
                }

                if !options.delay.is_zero() {
                    tokio::time::sleep(options.delay).await;
                }
            }
        }

        info!(
            "Reclassification finished: {} processed, {} updated, {} unchanged, {} errors",
            report.processed, report.updated, report.unchanged, report.errors
        );
        Ok(report)
    }
}
