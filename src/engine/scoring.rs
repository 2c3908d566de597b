use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const CREATE_OBJECT_POINTS: i64 = 5;
pub const JOIN_RIDE_POINTS: i64 = 10;
pub const UNJOIN_RIDE_POINTS: i64 = -10;
pub const RIDE_CANCELLED_POINTS: i64 = -10;
pub const DELETE_OBJECT_POINTS: i64 = -5;

/// Applies a score delta in place, under the profile's map entry. Callers
/// never read-modify-write scores themselves; concurrent joins and unjoins
/// cannot lose updates.
pub fn apply_score(state: &AppState, user_id: Uuid, delta: i64) -> Result<i64, AppError> {
    let mut user = state
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    user.score += delta;

    state
        .metrics
        .user_score
        .with_label_values(&[&user_id.to_string()])
        .set(user.score as f64);

    Ok(user.score)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::{apply_score, CREATE_OBJECT_POINTS, JOIN_RIDE_POINTS, UNJOIN_RIDE_POINTS};
    use crate::config::Config;
    use crate::models::user::UserProfile;
    use crate::state::AppState;

    fn test_state() -> Arc<AppState> {
        let config = Config {
            settings_path: None,
            ..Config::default()
        };
        let (state, _channels) = AppState::new(&config);
        Arc::new(state)
    }

    fn seed_user(state: &AppState, id_seed: u128) -> Uuid {
        let id = Uuid::from_u128(id_seed);
        state.users.insert(
            id,
            UserProfile {
                id,
                full_name: "Mika".to_string(),
                phone_number: "+381601234567".to_string(),
                email: "mika@example.com".to_string(),
                photo_uri: None,
                score: 0,
                created_at: Utc::now(),
            },
        );
        id
    }

    #[test]
    fn deltas_accumulate_in_place() {
        let state = test_state();
        let user = seed_user(&state, 1);

        assert_eq!(apply_score(&state, user, CREATE_OBJECT_POINTS).unwrap(), 5);
        assert_eq!(apply_score(&state, user, JOIN_RIDE_POINTS).unwrap(), 15);
        assert_eq!(apply_score(&state, user, UNJOIN_RIDE_POINTS).unwrap(), 5);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let state = test_state();
        assert!(apply_score(&state, Uuid::from_u128(42), 5).is_err());
    }
}
