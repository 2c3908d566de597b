use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::UserProfile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user).get(list_users))
        .route("/users/:id", get(get_user).patch(update_user))
        .route("/leaderboard", get(leaderboard))
}

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub photo_uri: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub photo_uri: Option<String>,
}

#[derive(Serialize)]
pub struct LeaderboardEntry {
    pub full_name: String,
    pub score: i64,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    if payload.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name cannot be empty".to_string()));
    }

    if payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("email cannot be empty".to_string()));
    }

    match state.users.entry(payload.id) {
        Entry::Occupied(_) => Err(AppError::Conflict(format!(
            "user {} already registered",
            payload.id
        ))),
        Entry::Vacant(slot) => {
            let user = UserProfile {
                id: payload.id,
                full_name: payload.full_name,
                phone_number: payload.phone_number,
                email: payload.email,
                photo_uri: payload.photo_uri,
                score: 0,
                created_at: Utc::now(),
            };

            slot.insert(user.clone());
            state
                .metrics
                .user_score
                .with_label_values(&[&user.id.to_string()])
                .set(0.0);

            Ok(Json(user))
        }
    }
}

async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<UserProfile>> {
    let users = state
        .users
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(users)
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .users
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

    Ok(Json(user.value().clone()))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let mut user = state
        .users
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

    if let Some(full_name) = payload.full_name {
        if full_name.trim().is_empty() {
            return Err(AppError::BadRequest("full_name cannot be empty".to_string()));
        }
        user.full_name = full_name;
    }
    if let Some(phone_number) = payload.phone_number {
        user.phone_number = phone_number;
    }
    if let Some(email) = payload.email {
        user.email = email;
    }
    if let Some(photo_uri) = payload.photo_uri {
        user.photo_uri = Some(photo_uri);
    }

    Ok(Json(user.clone()))
}

async fn leaderboard(State(state): State<Arc<AppState>>) -> Json<Vec<LeaderboardEntry>> {
    let mut entries: Vec<LeaderboardEntry> = state
        .users
        .iter()
        .map(|entry| LeaderboardEntry {
            full_name: entry.full_name.clone(),
            score: entry.score,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.full_name.cmp(&b.full_name))
    });

    Json(entries)
}
