use crate::error::AppError;
use crate::models::monitor::{LocationFix, MonitorCommand};
use crate::state::AppState;

pub async fn push_fix(state: &AppState, fix: LocationFix) -> Result<(), AppError> {
    state
        .fix_tx
        .send(fix)
        .await
        .map_err(|_| AppError::MonitorUnavailable)?;

    state.metrics.fixes_in_queue.inc();
    Ok(())
}

pub async fn send_command(state: &AppState, command: MonitorCommand) -> Result<(), AppError> {
    state
        .command_tx
        .send(command)
        .await
        .map_err(|_| AppError::MonitorUnavailable)
}
