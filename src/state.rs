use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use crate::config::Config;
use crate::models::monitor::{LocationFix, MonitorCommand, MonitorStatus, NearbyAlert};
use crate::models::object::MapObject;
use crate::models::user::UserProfile;
use crate::observability::metrics::Metrics;
use crate::settings::SettingsStore;

/// Platform permission grants, settable over the API in place of the
/// platform's own grant/revoke flow.
pub struct Permissions {
    location: AtomicBool,
    notifications: AtomicBool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionFlags {
    pub location: bool,
    pub notifications: bool,
}

impl Permissions {
    fn granted() -> Self {
        Self {
            location: AtomicBool::new(true),
            notifications: AtomicBool::new(true),
        }
    }

    pub fn location_granted(&self) -> bool {
        self.location.load(Ordering::Relaxed)
    }

    pub fn set_location(&self, granted: bool) {
        self.location.store(granted, Ordering::Relaxed);
    }

    pub fn notifications_granted(&self) -> bool {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn set_notifications(&self, granted: bool) {
        self.notifications.store(granted, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PermissionFlags {
        PermissionFlags {
            location: self.location_granted(),
            notifications: self.notifications_granted(),
        }
    }
}

/// Receiving ends of the monitor's channels, handed to
/// `run_proximity_monitor` when the engine task is spawned.
pub struct MonitorChannels {
    pub command_rx: mpsc::Receiver<MonitorCommand>,
    pub fix_rx: mpsc::Receiver<LocationFix>,
    pub status_tx: watch::Sender<MonitorStatus>,
}

pub struct AppState {
    pub objects: DashMap<Uuid, MapObject>,
    pub users: DashMap<Uuid, UserProfile>,
    pub categories: DashSet<String>,
    pub permissions: Permissions,
    pub fix_tx: mpsc::Sender<LocationFix>,
    pub command_tx: mpsc::Sender<MonitorCommand>,
    pub alerts_tx: broadcast::Sender<NearbyAlert>,
    pub monitor_status: watch::Receiver<MonitorStatus>,
    pub settings: SettingsStore,
    pub nearby_radius_m: f64,
    pub fix_interval: Duration,
    pub min_fix_interval: Duration,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, MonitorChannels) {
        let (fix_tx, fix_rx) = mpsc::channel(config.fix_queue_size);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (alerts_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let (status_tx, status_rx) = watch::channel(MonitorStatus::Stopped);

        (
            Self {
                objects: DashMap::new(),
                users: DashMap::new(),
                categories: DashSet::new(),
                permissions: Permissions::granted(),
                fix_tx,
                command_tx,
                alerts_tx,
                monitor_status: status_rx,
                settings: SettingsStore::open(config.settings_path.clone()),
                nearby_radius_m: config.nearby_radius_m,
                fix_interval: Duration::from_secs(config.fix_interval_secs),
                min_fix_interval: Duration::from_secs(config.min_fix_interval_secs),
                metrics: Metrics::new(),
            },
            MonitorChannels {
                command_rx,
                fix_rx,
                status_tx,
            },
        )
    }
}
