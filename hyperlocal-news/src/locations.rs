use crate::store::NewsStore;
use crate::types::{Area, NewsError, Result};
use crate::utils::normalize_area_name;
use tracing::info;

pub async fn set_area_location(store: &dyn NewsStore, area_name: &str, latitude: f64, longitude: f64) -> Result<Area> {
    let name = normalize_area_name(area_name);
    let area = store
        .find_area_by_name(&name)
        .await?
        .ok_or_else(|| NewsError::AreaNotFound { name: name.clone() })?;

    store.set_area_location(area.id, latitude, longitude).await?;
    info!("Updated location for '{}' to ({}, {})", name, latitude, longitude);

    Ok(Area {
        latitude: Some(latitude),
        longitude: Some(longitude),
        ..area
    })
}

/// Areas missing a coordinate. With `treat_zero_as_unmapped`, a 0.0
/// coordinate counts as missing too.
pub async fn unmapped_areas(store: &dyn NewsStore, treat_zero_as_unmapped: bool) -> Result<Vec<Area>> {
    let areas = store.list_areas().await?;
    Ok(areas
        .into_iter()
        .filter(|area| {
            let missing = |coord: Option<f64>| match coord {
                None => true,
                Some(v) => treat_zero_as_unmapped && v == 0.0,
            };
            missing(area.latitude) || missing(area.longitude)
        })
        .collect())
}
