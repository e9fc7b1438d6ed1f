//! Per-recruiter send cooldowns. A (user, recruiter) pair is blocked while
//! `blocked_until > now`; expired rows are simply ignored.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::recruiter::CooldownRow;

/// Longest accepted `OUTREACH_COOLDOWN_DAYS`.
pub const MAX_COOLDOWN_DAYS: i64 = 3650;

pub fn is_blocked(blocked_until: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    blocked_until > now
}

/// Recruiter id → end of block, for rows still in force at `now`.
pub fn active_blocks(rows: &[CooldownRow], now: DateTime<Utc>) -> HashMap<Uuid, DateTime<Utc>> {
    let mut blocks = HashMap::new();
    for row in rows.iter().filter(|r| is_blocked(r.blocked_until, now)) {
        blocks
            .entry(row.recruiter_id)
            .and_modify(|until: &mut DateTime<Utc>| *until = (*until).max(row.blocked_until))
            .or_insert(row.blocked_until);
    }
    blocks
}

/// End of the block started by a send at `now`. `days` is clamped to 0..=MAX_COOLDOWN_DAYS.
pub fn cooldown_until(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.clamp(0, MAX_COOLDOWN_DAYS))
        .and_then(|span| now.checked_add_signed(span))
        .unwrap_or(now)
}

pub async fn load_active_cooldowns(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<CooldownRow>, sqlx::Error> {
    sqlx::query_as::<_, CooldownRow>(
        "SELECT * FROM recruiter_cooldowns WHERE user_id = $1 AND blocked_until > $2",
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Blocks the recruiter for the user, never shortening an existing block.
pub async fn record_cooldown(
    conn: &mut PgConnection,
    user_id: Uuid,
    recruiter_id: Uuid,
    blocked_until: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO recruiter_cooldowns (user_id, recruiter_id, blocked_until)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, recruiter_id)
        DO UPDATE SET blocked_until = GREATEST(recruiter_cooldowns.blocked_until, EXCLUDED.blocked_until)
        "#,
    )
    .bind(user_id)
    .bind(recruiter_id)
    .bind(blocked_until)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(recruiter_id: Uuid, blocked_until: DateTime<Utc>) -> CooldownRow {
        CooldownRow {
            user_id: Uuid::nil(),
            recruiter_id,
            blocked_until,
        }
    }

    #[test]
    fn test_block_boundary_is_exclusive() {
        let now = Utc::now();
        assert!(is_blocked(now + Duration::seconds(1), now));
        assert!(!is_blocked(now, now));
        assert!(!is_blocked(now - Duration::days(1), now));
    }

    #[test]
    fn test_active_blocks_drops_expired_rows() {
        let now = Utc::now();
        let live = Uuid::new_v4();
        let expired = Uuid::new_v4();
        let blocks = active_blocks(
            &[row(live, now + Duration::days(2)), row(expired, now - Duration::hours(1))],
            now,
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[&live], now + Duration::days(2));
    }

    #[test]
    fn test_active_blocks_keeps_latest_end() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let blocks = active_blocks(
            &[row(id, now + Duration::days(1)), row(id, now + Duration::days(5))],
            now,
        );
        assert_eq!(blocks[&id], now + Duration::days(5));
    }

    #[test]
    fn test_cooldown_until_ignores_negative_days() {
        let now = Utc::now();
        assert_eq!(cooldown_until(now, 7), now + Duration::days(7));
        assert_eq!(cooldown_until(now, -3), now);
    }

    #[test]
    fn test_cooldown_until_caps_huge_values() {
        let now = Utc::now();
        assert_eq!(
            cooldown_until(now, 100_000_000),
            now + Duration::days(MAX_COOLDOWN_DAYS)
        );
        assert_eq!(cooldown_until(now, i64::MAX), now + Duration::days(MAX_COOLDOWN_DAYS));
    }
}
