use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub position: String,
    pub status: String,
    pub job_url: Option<String>,
    pub notes: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationThreadRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recruiter_id: Option<Uuid>,
    pub subject: String,
    pub gmail_thread_id: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationMessageRow {
    pub id: Uuid,
    pub thread_id: Uuid,
    /// inbound | outbound
    pub direction: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}
