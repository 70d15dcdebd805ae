use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Correlation key, unique per user. Lets a notification be dismissed
    /// without knowing who it was shown to.
    pub key: String,
    pub template_key: String,
    pub message_opts: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub key: String,
    pub template_key: String,
    pub message_opts: serde_json::Value,
}
