use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::engine::feed::{push_fix, send_command};
use crate::error::AppError;
use crate::models::monitor::{LocationFix, MonitorCommand, MonitorStatus};
use crate::settings::Settings;
use crate::state::{AppState, PermissionFlags};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/monitor", get(monitor_status))
        .route("/monitor/enabled", put(set_enabled))
        .route("/monitor/permissions", patch(update_permissions))
        .route("/location", post(report_location))
}

#[derive(Serialize)]
pub struct MonitorResponse {
    pub status: MonitorStatus,
    pub enabled: bool,
    pub permissions: PermissionFlags,
}

#[derive(Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct UpdatePermissionsRequest {
    pub location: Option<bool>,
    pub notifications: Option<bool>,
}

fn monitor_response(state: &AppState) -> MonitorResponse {
    MonitorResponse {
        status: *state.monitor_status.borrow(),
        enabled: state.settings.current().monitor_enabled,
        permissions: state.permissions.snapshot(),
    }
}

async fn monitor_status(State(state): State<Arc<AppState>>) -> Json<MonitorResponse> {
    Json(monitor_response(&state))
}

async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<Json<MonitorResponse>, AppError> {
    state
        .settings
        .update(Settings {
            monitor_enabled: payload.enabled,
        })
        .await?;

    let command = if payload.enabled {
        MonitorCommand::Start
    } else {
        MonitorCommand::Stop
    };
    send_command(&state, command).await?;

    Ok(Json(monitor_response(&state)))
}

async fn update_permissions(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdatePermissionsRequest>,
) -> Json<PermissionFlags> {
    if let Some(granted) = payload.location {
        state.permissions.set_location(granted);
    }
    if let Some(granted) = payload.notifications {
        state.permissions.set_notifications(granted);
    }

    Json(state.permissions.snapshot())
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Json(fix): Json<LocationFix>,
) -> Result<StatusCode, AppError> {
    push_fix(&state, fix).await?;
    Ok(StatusCode::ACCEPTED)
}
