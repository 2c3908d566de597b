use uuid::Uuid;

use crate::geo::haversine_m;
use crate::models::object::{GeoPoint, MapObject};

/// Active filter criteria for the map view. Absent or empty values match
/// everything; an empty string is a filter no-op, not a request to match
/// zero objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    pub category: Option<String>,
    pub creator_id: Option<Uuid>,
    pub search: Option<String>,
    pub origin: Option<GeoPoint>,
    pub radius_m: Option<f64>,
}

/// Applies all active predicates (AND) over an immutable snapshot and
/// returns the kept objects sorted ascending by category, same-category
/// objects keeping the snapshot order.
pub fn filter_objects(objects: &[MapObject], filter: &ObjectFilter) -> Vec<MapObject> {
    let category = normalize(filter.category.as_deref());
    let search = normalize(filter.search.as_deref());
    // A non-finite or negative radius means "unbounded".
    let radius_m = filter.radius_m.filter(|r| r.is_finite() && *r >= 0.0);

    let mut kept: Vec<MapObject> = objects
        .iter()
        .filter(|object| {
            if let Some(category) = &category {
                if object.category.trim().to_lowercase() != *category {
                    return false;
                }
            }

            if let Some(creator_id) = filter.creator_id {
                if object.creator_id != creator_id {
                    return false;
                }
            }

            if let Some(search) = &search {
                if !object.name.to_lowercase().contains(search.as_str()) {
                    return false;
                }
            }

            if let (Some(origin), Some(radius_m)) = (filter.origin, radius_m) {
                if haversine_m(&origin, &object.location) > radius_m {
                    return false;
                }
            }

            true
        })
        .cloned()
        .collect();

    kept.sort_by_key(|object| object.category.trim().to_lowercase());
    kept
}

fn normalize(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
