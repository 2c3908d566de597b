use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::filter::{filter_objects, ObjectFilter};
use crate::engine::scoring::{
    apply_score, CREATE_OBJECT_POINTS, DELETE_OBJECT_POINTS, JOIN_RIDE_POINTS,
    RIDE_CANCELLED_POINTS, UNJOIN_RIDE_POINTS,
};
use crate::error::AppError;
use crate::models::object::{GeoPoint, IconKind, MapObject};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/objects", post(create_object).get(list_objects))
        .route("/objects/:id", get(get_object).delete(delete_object))
        .route("/objects/:id/riders", post(join_ride))
        .route("/objects/:id/riders/:user_id", delete(unjoin_ride))
        .route("/categories", get(list_categories))
}

#[derive(Deserialize)]
pub struct CreateObjectRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub icon: IconKind,
    pub image_uri: Option<String>,
    pub creator_id: Uuid,
    #[serde(default)]
    pub ride: bool,
    pub scheduled_start: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct ListObjectsQuery {
    pub category: Option<String>,
    pub creator_id: Option<Uuid>,
    pub search: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_m: Option<f64>,
}

#[derive(Deserialize)]
pub struct DeleteObjectRequest {
    pub requested_by: Uuid,
}

#[derive(Deserialize)]
pub struct JoinRideRequest {
    pub user_id: Uuid,
}

async fn create_object(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateObjectRequest>,
) -> Result<Json<MapObject>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "description cannot be empty".to_string(),
        ));
    }

    if payload.scheduled_start.is_some() && !payload.ride {
        return Err(AppError::BadRequest(
            "scheduled_start is only valid for rides".to_string(),
        ));
    }

    if !state.users.contains_key(&payload.creator_id) {
        return Err(AppError::NotFound(format!(
            "user {} not found",
            payload.creator_id
        )));
    }

    // Rides always land in the shared "Ride" category.
    let category = if payload.ride {
        "Ride".to_string()
    } else {
        let category = payload.category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::BadRequest("category cannot be empty".to_string()));
        }
        category
    };

    let object = MapObject {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        category: category.clone(),
        location: payload.location,
        icon: payload.icon,
        image_uri: payload.image_uri,
        creator_id: payload.creator_id,
        ride: payload.ride,
        scheduled_start: payload.scheduled_start,
        riders: BTreeSet::new(),
        created_at: Utc::now(),
    };

    state.categories.insert(category);
    state.objects.insert(object.id, object.clone());
    apply_score(&state, object.creator_id, CREATE_OBJECT_POINTS)?;

    info!(
        object_id = %object.id,
        creator_id = %object.creator_id,
        ride = object.ride,
        "object created"
    );

    Ok(Json(object))
}

async fn list_objects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Json<Vec<MapObject>>, AppError> {
    let origin = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "lat and lng must be provided together".to_string(),
            ))
        }
    };

    let mut snapshot: Vec<MapObject> = state
        .objects
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    snapshot.sort_by_key(|object| (object.created_at, object.id));

    let filter = ObjectFilter {
        category: query.category,
        creator_id: query.creator_id,
        search: query.search,
        origin,
        radius_m: query.radius_m,
    };

    Ok(Json(filter_objects(&snapshot, &filter)))
}

async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MapObject>, AppError> {
    let object = state
        .objects
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("object {} not found", id)))?;

    Ok(Json(object.value().clone()))
}

async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeleteObjectRequest>,
) -> Result<StatusCode, AppError> {
    {
        let object = state
            .objects
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("object {} not found", id)))?;

        if object.creator_id != payload.requested_by {
            return Err(AppError::Forbidden(
                "only the creator can delete an object".to_string(),
            ));
        }
    }

    let Some((_, object)) = state.objects.remove(&id) else {
        return Err(AppError::NotFound(format!("object {} not found", id)));
    };

    // Cascade: every rider gives back the join points, then the creator
    // loses the creation bonus.
    for rider in &object.riders {
        if let Err(err) = apply_score(&state, *rider, RIDE_CANCELLED_POINTS) {
            warn!(error = %err, user_id = %rider, "failed to settle rider score");
        }
    }
    apply_score(&state, object.creator_id, DELETE_OBJECT_POINTS)?;

    info!(
        object_id = %id,
        riders = object.riders.len(),
        "object deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn join_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinRideRequest>,
) -> Result<Json<MapObject>, AppError> {
    if !state.users.contains_key(&payload.user_id) {
        return Err(AppError::NotFound(format!(
            "user {} not found",
            payload.user_id
        )));
    }

    let mut object = state
        .objects
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("object {} not found", id)))?;

    if !object.ride {
        return Err(AppError::BadRequest(format!("object {} is not a ride", id)));
    }

    // Inserting an existing rider is a no-op; no points are awarded twice.
    if object.riders.insert(payload.user_id) {
        apply_score(&state, payload.user_id, JOIN_RIDE_POINTS)?;
        info!(object_id = %id, user_id = %payload.user_id, "rider joined");
    }

    Ok(Json(object.clone()))
}

async fn unjoin_ride(
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MapObject>, AppError> {
    let mut object = state
        .objects
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("object {} not found", id)))?;

    if object.riders.remove(&user_id) {
        apply_score(&state, user_id, UNJOIN_RIDE_POINTS)?;
        info!(object_id = %id, user_id = %user_id, "rider unjoined");
    }

    Ok(Json(object.clone()))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let mut categories: Vec<String> = state
        .categories
        .iter()
        .map(|entry| entry.key().clone())
        .collect();
    categories.sort();
    Json(categories)
}
