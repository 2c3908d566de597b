use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::geo::haversine_m;
use crate::models::monitor::{LocationFix, MonitorCommand, MonitorStatus, NearbyAlert};
use crate::models::object::MapObject;
use crate::state::{AppState, MonitorChannels};

/// De-duplication state for one monitoring session. Created fresh on every
/// start, discarded on stop; an object id that is already present is never
/// notified again within the session.
#[derive(Default)]
struct Session {
    notified: HashSet<Uuid>,
}

/// Long-lived background task observing the device's evolving position.
/// Driven entirely by pushed commands and location fixes; it never polls.
/// Zero fixes ever arriving is valid and emits nothing.
pub async fn run_proximity_monitor(state: Arc<AppState>, channels: MonitorChannels) {
    let MonitorChannels {
        mut command_rx,
        mut fix_rx,
        status_tx,
    } = channels;

    let mut session: Option<Session> = None;

    info!("proximity monitor started");

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(command) => handle_command(&state, &mut session, &status_tx, command),
                None => break,
            },
            fix = fix_rx.recv() => match fix {
                Some(fix) => {
                    state.metrics.fixes_in_queue.dec();
                    handle_fix(&state, &mut session, &status_tx, fix);
                }
                None => break,
            },
        }
    }

    warn!("proximity monitor stopped: channels closed");
}

fn handle_command(
    state: &AppState,
    session: &mut Option<Session>,
    status_tx: &watch::Sender<MonitorStatus>,
    command: MonitorCommand,
) {
    match command {
        MonitorCommand::Start => {
            if !state.permissions.location_granted() {
                warn!("location permission missing; monitor stays stopped");
                *session = None;
                status_tx.send_replace(MonitorStatus::Stopped);
                return;
            }

            info!(
                target_interval_secs = state.fix_interval.as_secs(),
                min_interval_secs = state.min_fix_interval.as_secs(),
                high_accuracy = true,
                "monitor session started; location updates requested"
            );
            // A start always begins a fresh session: prior de-duplication
            // state is cleared.
            *session = Some(Session::default());
            status_tx.send_replace(MonitorStatus::Running);
        }
        MonitorCommand::Stop => {
            if session.take().is_some() {
                info!("monitor session stopped; location updates deregistered");
            }
            status_tx.send_replace(MonitorStatus::Stopped);
        }
    }
}

fn handle_fix(
    state: &AppState,
    session: &mut Option<Session>,
    status_tx: &watch::Sender<MonitorStatus>,
    fix: LocationFix,
) {
    if session.is_some() && !state.permissions.location_granted() {
        info!("location permission revoked; stopping monitor session");
        *session = None;
        status_tx.send_replace(MonitorStatus::Stopped);
        return;
    }

    // Fixes that arrive while stopped (including late ones from a session
    // that was just torn down) are dropped; they cannot resurrect it.
    let Some(active) = session.as_mut() else {
        debug!("dropping location fix: monitor not running");
        return;
    };

    let started = Instant::now();
    let mut newly_notified = 0usize;

    for entry in state.objects.iter() {
        let object = entry.value();
        let distance_m = haversine_m(&fix.location, &object.location);

        if distance_m <= state.nearby_radius_m && !active.notified.contains(&object.id) {
            active.notified.insert(object.id);
            newly_notified += 1;
            debug!(
                object_id = %object.id,
                distance_m,
                "object entered nearby radius"
            );
            emit_alert(state, object, distance_m);
        }
    }

    let result = if newly_notified > 0 { "notified" } else { "quiet" };
    state
        .metrics
        .fix_scan_seconds
        .with_label_values(&[result])
        .observe(started.elapsed().as_secs_f64());
}

fn emit_alert(state: &AppState, object: &MapObject, distance_m: f64) {
    // Presentation is skipped silently without the notification permission;
    // the object still counts as notified for this session.
    if !state.permissions.notifications_granted() {
        state
            .metrics
            .notifications_total
            .with_label_values(&["suppressed"])
            .inc();
        return;
    }

    let alert = NearbyAlert {
        object_id: object.id,
        title: "Nearby Object".to_string(),
        body: format!(
            "An object '{}' is within {:.0} meters of your location.",
            object.name, state.nearby_radius_m
        ),
        distance_m,
        at: Utc::now(),
    };

    // Fire-and-forget: nobody listening is fine.
    let _ = state.alerts_tx.send(alert);

    state
        .metrics
        .notifications_total
        .with_label_values(&["sent"])
        .inc();
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::watch;
    use tokio::time::timeout;
    use uuid::Uuid;

    use super::run_proximity_monitor;
    use crate::config::Config;
    use crate::engine::feed::{push_fix, send_command};
    use crate::models::monitor::{LocationFix, MonitorCommand, MonitorStatus};
    use crate::models::object::{GeoPoint, IconKind, MapObject};
    use crate::state::AppState;

    fn test_state() -> Arc<AppState> {
        let config = Config {
            settings_path: None,
            ..Config::default()
        };
        let (state, channels) = AppState::new(&config);
        let state = Arc::new(state);
        tokio::spawn(run_proximity_monitor(state.clone(), channels));
        state
    }

    fn seed_object(state: &AppState, name: &str, lat: f64, lng: f64) -> Uuid {
        let id = Uuid::new_v4();
        state.objects.insert(
            id,
            MapObject {
                id,
                name: name.to_string(),
                description: "trailside".to_string(),
                category: "Water".to_string(),
                location: GeoPoint { lat, lng },
                icon: IconKind::Water,
                image_uri: None,
                creator_id: Uuid::from_u128(1),
                ride: false,
                scheduled_start: None,
                riders: BTreeSet::new(),
                created_at: Utc::now(),
            },
        );
        id
    }

    fn fix(lat: f64, lng: f64) -> LocationFix {
        LocationFix {
            location: GeoPoint { lat, lng },
        }
    }

    async fn wait_for_status(rx: &mut watch::Receiver<MonitorStatus>, want: MonitorStatus) {
        timeout(Duration::from_secs(1), async {
            loop {
                if *rx.borrow() == want {
                    return;
                }
                rx.changed().await.expect("monitor status channel closed");
            }
        })
        .await
        .expect("timed out waiting for monitor status");
    }

    #[tokio::test]
    async fn repeated_fixes_in_radius_notify_once() {
        let state = test_state();
        let object_id = seed_object(&state, "fountain", 0.0, 0.0);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;

        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();
        push_fix(&state, fix(0.0004, 0.0)).await.unwrap();

        let alert = timeout(Duration::from_secs(1), alerts.recv())
            .await
            .expect("expected one alert")
            .unwrap();
        assert_eq!(alert.object_id, object_id);
        assert_eq!(alert.title, "Nearby Object");
        assert!(alert.body.contains("fountain"));

        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn leaving_and_reentering_radius_does_not_renotify() {
        let state = test_state();
        seed_object(&state, "fountain", 0.0, 0.0);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;

        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();
        push_fix(&state, fix(1.0, 1.0)).await.unwrap();
        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();

        timeout(Duration::from_secs(1), alerts.recv())
            .await
            .expect("expected first alert")
            .unwrap();
        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn restart_clears_deduplication_state() {
        let state = test_state();
        seed_object(&state, "fountain", 0.0, 0.0);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;
        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();
        timeout(Duration::from_secs(1), alerts.recv())
            .await
            .expect("expected alert in first session")
            .unwrap();

        send_command(&state, MonitorCommand::Stop).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Stopped).await;

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;
        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();

        timeout(Duration::from_secs(1), alerts.recv())
            .await
            .expect("expected alert again in a fresh session")
            .unwrap();
    }

    #[tokio::test]
    async fn fixes_after_stop_are_dropped() {
        let state = test_state();
        seed_object(&state, "fountain", 0.0, 0.0);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;
        send_command(&state, MonitorCommand::Stop).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Stopped).await;

        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();

        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn start_without_location_permission_stays_stopped() {
        let state = test_state();
        state.permissions.set_location(false);
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*status.borrow(), MonitorStatus::Stopped);

        state.permissions.set_location(true);
        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;
    }

    #[tokio::test]
    async fn revoking_location_permission_stops_the_session() {
        let state = test_state();
        seed_object(&state, "fountain", 0.0, 0.0);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;

        state.permissions.set_location(false);
        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();

        wait_for_status(&mut status, MonitorStatus::Stopped).await;
        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn missing_notification_permission_suppresses_presentation() {
        let state = test_state();
        seed_object(&state, "fountain", 0.0, 0.0);
        state.permissions.set_notifications(false);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;
        push_fix(&state, fix(0.0005, 0.0)).await.unwrap();

        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());

        // The object still counts as notified: re-granting the permission
        // does not replay it within the same session.
        state.permissions.set_notifications(true);
        push_fix(&state, fix(0.0004, 0.0)).await.unwrap();
        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn objects_outside_radius_are_ignored() {
        let state = test_state();
        seed_object(&state, "far fountain", 0.0, 0.002);
        let mut alerts = state.alerts_tx.subscribe();
        let mut status = state.monitor_status.clone();

        send_command(&state, MonitorCommand::Start).await.unwrap();
        wait_for_status(&mut status, MonitorStatus::Running).await;
        push_fix(&state, fix(0.0, 0.0)).await.unwrap();

        assert!(timeout(Duration::from_millis(200), alerts.recv())
            .await
            .is_err());
    }
}
