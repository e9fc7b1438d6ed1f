use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::tiers::{effective_tier, reserve_quota, QuotaReservation, Tier};

pub async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<ProfileRow, AppError> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {user_id} not found")))
}

impl ProfileRow {
    /// Tier the user is entitled to right now.
    pub fn tier_at(&self, now: DateTime<Utc>) -> Tier {
        effective_tier(&self.subscription_tier, self.subscription_expires_at, now)
    }
}

/// Claims up to `wanted` of today's send slots while holding the profile row lock,
/// so concurrent sends for one user never share a slot.
pub async fn reserve_sends(
    pool: &PgPool,
    user_id: Uuid,
    tier: Tier,
    wanted: u32,
    today: NaiveDate,
) -> Result<QuotaReservation, AppError> {
    let mut tx = pool.begin().await?;

    let (sent_today, counter_date): (i32, NaiveDate) = sqlx::query_as(
        "SELECT emails_sent_today, emails_counter_date FROM profiles WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Profile {user_id} not found")))?;

    let reservation = reserve_quota(tier, sent_today, counter_date, today, wanted);

    sqlx::query("UPDATE profiles SET emails_sent_today = $2, emails_counter_date = $3 WHERE id = $1")
        .bind(user_id)
        .bind(reservation.sent_today)
        .bind(today)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(reservation)
}

/// Hands unused slots back. A counter that has already rolled over to a later day is left alone.
pub async fn release_sends(
    pool: &PgPool,
    user_id: Uuid,
    unused: u32,
    today: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE profiles
        SET emails_sent_today = GREATEST(emails_sent_today - $2, 0)
        WHERE id = $1 AND emails_counter_date = $3
        "#,
    )
    .bind(user_id)
    .bind(i32::try_from(unused).unwrap_or(i32::MAX))
    .bind(today)
    .execute(pool)
    .await?;
    Ok(())
}
