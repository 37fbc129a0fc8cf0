use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Teacher {
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}
