use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Marker glyph shown for an object on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IconKind {
    #[default]
    DefaultPin,
    Food,
    ServiceCenter,
    Water,
    Shop,
}

impl IconKind {
    /// Maps the integer icon code used by exported records. Unknown codes
    /// fall back to the default pin.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => IconKind::Food,
            2 => IconKind::ServiceCenter,
            3 => IconKind::Water,
            4 => IconKind::Shop,
            _ => IconKind::DefaultPin,
        }
    }
}

/// A user-created map annotation, optionally a scheduled group ride.
///
/// `riders` is the single source of truth for ride membership. It is a set:
/// joining twice is a no-op and cannot award points twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapObject {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: GeoPoint,
    pub icon: IconKind,
    pub image_uri: Option<String>,
    pub creator_id: Uuid,
    pub ride: bool,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub riders: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The consumed document-store shape for an exported object record. Every
/// field is optional at the decode level; `into_object` decides which are
/// actually required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObjectRecord {
    pub id: Option<Uuid>,
    pub location: Option<GeoPoint>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<u32>,
    pub image_uri: Option<String>,
    pub creator_id: Option<Uuid>,
    pub category: Option<String>,
    pub ride: Option<bool>,
    pub start: Option<String>,
    pub riders: Option<Vec<Uuid>>,
}

impl RawObjectRecord {
    /// Returns `None` when any of the required fields (location, name,
    /// description, creator) is missing.
    pub fn into_object(self) -> Option<MapObject> {
        let location = self.location?;
        let name = self.name?;
        let description = self.description?;
        let creator_id = self.creator_id?;

        Some(MapObject {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name,
            description,
            category: self
                .category
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
            location,
            icon: self.icon.map(IconKind::from_code).unwrap_or_default(),
            image_uri: self.image_uri,
            creator_id,
            ride: self.ride.unwrap_or(false),
            scheduled_start: self.start.as_deref().and_then(parse_start),
            riders: self.riders.unwrap_or_default().into_iter().collect(),
            created_at: Utc::now(),
        })
    }
}

/// Builds the in-memory object set from a record batch. Malformed records
/// are dropped individually; the rest of the batch is unaffected.
pub fn decode_records(records: Vec<RawObjectRecord>) -> Vec<MapObject> {
    records
        .into_iter()
        .filter_map(|record| {
            let record_id = record.id;
            match record.into_object() {
                Some(object) => Some(object),
                None => {
                    tracing::warn!(
                        record_id = ?record_id,
                        "skipping object record with missing required fields"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Exported records carry start times either as RFC 3339 or in the legacy
/// `yyyy-MM-dd HH:mm` form. Unparseable values decode as no start time.
fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|start| start.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{decode_records, parse_start, GeoPoint, IconKind, RawObjectRecord};

    fn record(name: &str, creator_id: Option<Uuid>) -> RawObjectRecord {
        RawObjectRecord {
            id: Some(Uuid::new_v4()),
            location: Some(GeoPoint { lat: 43.32, lng: 21.89 }),
            name: Some(name.to_string()),
            description: Some("a place".to_string()),
            icon: Some(3),
            image_uri: None,
            creator_id,
            category: Some(" Water ".to_string()),
            ride: Some(false),
            start: None,
            riders: None,
        }
    }

    #[test]
    fn record_missing_creator_is_skipped_without_affecting_batch() {
        let creator = Uuid::from_u128(7);
        let records = vec![
            record("fountain", Some(creator)),
            record("orphan", None),
            record("repair stand", Some(creator)),
        ];

        let objects = decode_records(records);

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "fountain");
        assert_eq!(objects[1].name, "repair stand");
    }

    #[test]
    fn decoded_category_is_trimmed() {
        let objects = decode_records(vec![record("fountain", Some(Uuid::from_u128(7)))]);
        assert_eq!(objects[0].category, "Water");
    }

    #[test]
    fn icon_codes_map_to_kinds() {
        assert_eq!(IconKind::from_code(1), IconKind::Food);
        assert_eq!(IconKind::from_code(3), IconKind::Water);
        assert_eq!(IconKind::from_code(99), IconKind::DefaultPin);
    }

    #[test]
    fn start_parses_rfc3339_and_legacy_format() {
        assert!(parse_start("2026-08-01T18:30:00Z").is_some());
        assert!(parse_start("2026-08-01 18:30").is_some());
        assert!(parse_start("next tuesday").is_none());
    }

    #[test]
    fn duplicate_riders_collapse_into_set() {
        let rider = Uuid::from_u128(11);
        let mut raw = record("morning loop", Some(Uuid::from_u128(7)));
        raw.ride = Some(true);
        raw.riders = Some(vec![rider, rider]);

        let objects = decode_records(vec![raw]);

        assert_eq!(objects[0].riders.len(), 1);
    }
}
