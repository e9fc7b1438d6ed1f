use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    /// Free text as written by billing and admin tools; normalize with `tiers::get_tier_level`.
    pub subscription_tier: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub emails_sent_today: i32,
    pub emails_counter_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
