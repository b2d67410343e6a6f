//! "Did you mean" resolution of user-typed area names.
//!
//! An exact match on the normalized name always wins and skips fuzzy
//! matching. Otherwise every stored area is scored with a normalized
//! Levenshtein ratio and the best score decides between auto-correcting to
//! the existing area, suggesting it, or creating a new one.

use crate::store::NewsStore;
use crate::types::{Area, NewsError, Result};
use crate::utils::normalize_area_name;
use std::sync::Arc;
use tracing::{debug, info};

/// At or above this ratio a typo is silently corrected to the existing area.
pub const AUTO_CORRECT_THRESHOLD: f64 = 0.7;
/// At or above this ratio (and below auto-correct) the existing area is only suggested.
pub const SUGGEST_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    Exact,
    AutoCorrected,
    Suggested,
    Created,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: ResolveStatus,
    pub area: Area,
    /// Name of the close-but-not-close-enough area, for `Suggested` only.
    pub suggestion: Option<String>,
    /// Best fuzzy ratio seen; 1.0 for exact matches.
    pub ratio: f64,
}

/// Similarity ratio in [0, 1]; 1.0 means identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Best-scoring area. The first area with a strictly greater ratio wins, so
/// ties go to whichever comes first in `areas`.
pub fn best_match<'a>(input: &str, areas: &'a [Area]) -> Option<(&'a Area, f64)> {
    let mut best: Option<(&Area, f64)> = None;
    for area in areas {
        let ratio = similarity(input, &area.name);
        if best.map_or(true, |(_, best_ratio)| ratio > best_ratio) {
            best = Some((area, ratio));
        }
    }
    best
}

pub struct AreaResolver {
    store: Arc<dyn NewsStore>,
}

impl AreaResolver {
    pub fn new(store: Arc<dyn NewsStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, raw_input: &str) -> Result<Resolution> {
        let name = normalize_area_name(raw_input);
        if name.is_empty() {
            return Err(NewsError::InvalidAreaName);
        }

        if let Some(area) = self.store.find_area_by_name(&name).await? {
            debug!("Area '{}' matched exactly (ID: {})", name, area.id);
            return Ok(Resolution {
                status: ResolveStatus::Exact,
                area,
                suggestion: None,
                ratio: 1.0,
            });
        }

        let areas = self.store.list_areas().await?;
        let best = best_match(&name, &areas);

        match best {
            Some((matched, ratio)) if ratio >= AUTO_CORRECT_THRESHOLD => {
                info!("Auto-corrected area '{}' to '{}' (ratio {:.2})", name, matched.name, ratio);
                Ok(Resolution {
                    status: ResolveStatus::AutoCorrected,
                    area: matched.clone(),
                    suggestion: None,
                    ratio,
                })
            }
            Some((matched, ratio)) if ratio >= SUGGEST_THRESHOLD => {
                let suggestion = matched.name.clone();
                let (area, _) = self.store.get_or_create_area(&name).await?;
                info!("Created area '{}', suggesting '{}' (ratio {:.2})", name, suggestion, ratio);
                Ok(Resolution {
                    status: ResolveStatus::Suggested,
                    area,
                    suggestion: Some(suggestion),
                    ratio,
                })
            }
            other => {
                let ratio = other.map(|(_, r)| r).unwrap_or(0.0);
                let (area, _) = self.store.get_or_create_area(&name).await?;
                info!("Created area '{}' (best ratio {:.2})", name, ratio);
                Ok(Resolution {
                    status: ResolveStatus::Created,
                    area,
                    suggestion: None,
                    ratio,
                })
            }
        }
    }

    /// Exact lookup on the normalized name, no fuzzy matching, no creation.
    pub async fn find(&self, raw_input: &str) -> Result<Area> {
        let name = normalize_area_name(raw_input);
        if name.is_empty() {
            return Err(NewsError::InvalidAreaName);
        }
        self.store
            .find_area_by_name(&name)
            .await?
            .ok_or_else(|| NewsError::AreaNotFound { name: name.clone() })
    }
}
