use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile record backing a registered rider. `id` equals the
/// authentication identity's id and is supplied by the client at
/// registration. `score` is only ever mutated through the score ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub photo_uri: Option<String>,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}
