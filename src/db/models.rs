use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Stored Spotify connection, one row per Spotify user id.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbCredentialRecord {
    pub id: i64,
    pub user_id: String,
    pub display_name: String,
    pub access_token: String,
    pub refresh_token: String,
    pub account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by a successful callback; timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewCredentialRecord {
    pub user_id: String,
    pub display_name: String,
    pub access_token: String,
    pub refresh_token: String,
}
