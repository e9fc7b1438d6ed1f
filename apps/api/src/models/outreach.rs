use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailTemplateRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailTrackingRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recruiter_id: Uuid,
    pub subject: String,
    pub status: String,
    pub gmail_message_id: Option<String>,
    pub gmail_thread_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Stored Gmail OAuth credentials. Tokens never leave the server.
#[derive(Debug, Clone, FromRow)]
pub struct GmailTokenRow {
    pub gmail_address: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}
