use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::object::GeoPoint;

/// A single position report from the device's location provider. Fixes
/// carry no timestamp; ordering is implicit in arrival order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationFix {
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorStatus {
    Stopped,
    Running,
}

/// One "nearby object" notification, emitted at most once per object per
/// monitoring session.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyAlert {
    pub object_id: Uuid,
    pub title: String,
    pub body: String,
    pub distance_m: f64,
    pub at: DateTime<Utc>,
}
