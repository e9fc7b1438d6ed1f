//! Subscription tiers: normalization of free-text tier labels and the access
//! rules built on them.
//!
//! Tier strings arrive from billing rows, admin edits and recruiter imports, so
//! they are matched loosely: "PRO_MAX", "Pro Max" and "promax" are all `ProMax`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Free = 1,
    Pro = 2,
    ProMax = 3,
}

impl Tier {
    pub fn from_level(level: u8) -> Tier {
        match level {
            3.. => Tier::ProMax,
            2 => Tier::Pro,
            _ => Tier::Free,
        }
    }

    /// Canonical label written back to the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Pro => "PRO",
            Tier::ProMax => "PRO_MAX",
        }
    }

    /// Emails a user on this tier may send per calendar day (UTC).
    pub fn daily_send_limit(self) -> u32 {
        match self {
            Tier::Free => 5,
            Tier::Pro => 50,
            Tier::ProMax => 200,
        }
    }
}

/// Normalizes a free-text tier label to a level in 1..=3. Unknown or blank is FREE.
pub fn get_tier_level(raw: &str) -> u8 {
    let compact: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect();

    if compact.contains("max") || compact.contains("ultimate") {
        3
    } else if compact.contains("pro") || compact.contains("premium") {
        2
    } else {
        1
    }
}

pub fn parse_tier(raw: &str) -> Tier {
    Tier::from_level(get_tier_level(raw))
}

/// Tier a profile is entitled to right now. A lapsed paid subscription falls back to FREE.
pub fn effective_tier(raw: &str, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Tier {
    match expires_at {
        Some(expiry) if expiry <= now => Tier::Free,
        _ => parse_tier(raw),
    }
}

/// A user can see and contact recruiters at or below their own tier.
pub fn can_access_recruiter(user_tier: &str, recruiter_tier: &str) -> bool {
    get_tier_level(user_tier) >= get_tier_level(recruiter_tier)
}

fn sent_on(sent_today: i32, counter_date: NaiveDate, today: NaiveDate) -> u32 {
    if counter_date < today {
        0
    } else {
        u32::try_from(sent_today).unwrap_or(0)
    }
}

/// Sends left today. A counter stamped on an earlier day no longer counts.
pub fn remaining_quota(
    tier: Tier,
    sent_today: i32,
    counter_date: NaiveDate,
    today: NaiveDate,
) -> u32 {
    tier.daily_send_limit().saturating_sub(sent_on(sent_today, counter_date, today))
}

/// Slots claimed against today's counter before any mail goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaReservation {
    /// At most the number asked for.
    pub granted: u32,
    /// Counter value to store for today, granted slots included.
    pub sent_today: i32,
    /// Slots still free once the grant is taken.
    pub remaining: u32,
}

pub fn reserve_quota(
    tier: Tier,
    sent_today: i32,
    counter_date: NaiveDate,
    today: NaiveDate,
    wanted: u32,
) -> QuotaReservation {
    let used = sent_on(sent_today, counter_date, today);
    let available = tier.daily_send_limit().saturating_sub(used);
    let granted = available.min(wanted);
    QuotaReservation {
        granted,
        sent_today: i32::try_from(used + granted).unwrap_or(i32::MAX),
        remaining: available - granted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_level_spellings() {
        assert_eq!(get_tier_level("PRO_MAX"), 3);
        assert_eq!(get_tier_level("Pro Max"), 3);
        assert_eq!(get_tier_level("pro-max"), 3);
        assert_eq!(get_tier_level("PRO"), 2);
        assert_eq!(get_tier_level("Premium"), 2);
        assert_eq!(get_tier_level("FREE"), 1);
        assert_eq!(get_tier_level(""), 1);
        assert_eq!(get_tier_level("gold"), 1);
    }

    #[test]
    fn test_parse_tier_round_trips_canonical_labels() {
        for tier in [Tier::Free, Tier::Pro, Tier::ProMax] {
            assert_eq!(parse_tier(tier.as_str()), tier);
        }
    }

    #[test]
    fn test_recruiter_access_is_monotonic() {
        assert!(can_access_recruiter("PRO_MAX", "PRO"));
        assert!(can_access_recruiter("PRO", "PRO"));
        assert!(can_access_recruiter("free", ""));
        assert!(!can_access_recruiter("FREE", "PRO"));
        assert!(!can_access_recruiter("pro", "Pro Max"));
    }

    #[test]
    fn test_lapsed_subscription_is_free() {
        let now = Utc::now();
        assert_eq!(effective_tier("PRO", None, now), Tier::Pro);
        assert_eq!(
            effective_tier("PRO", Some(now + chrono::Duration::days(3)), now),
            Tier::Pro
        );
        assert_eq!(
            effective_tier("PRO_MAX", Some(now - chrono::Duration::seconds(1)), now),
            Tier::Free
        );
    }

    #[test]
    fn test_daily_limits_increase_with_tier() {
        assert!(Tier::Free.daily_send_limit() < Tier::Pro.daily_send_limit());
        assert!(Tier::Pro.daily_send_limit() < Tier::ProMax.daily_send_limit());
    }

    #[test]
    fn test_remaining_quota_resets_on_new_day() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(remaining_quota(Tier::Free, 3, today, today), 2);
        assert_eq!(remaining_quota(Tier::Free, 9, today, today), 0);
        assert_eq!(remaining_quota(Tier::Free, 5, yesterday, today), 5);
        assert_eq!(remaining_quota(Tier::Pro, -4, today, today), 50);
    }

    #[test]
    fn test_reservation_grants_up_to_remaining() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let r = reserve_quota(Tier::Free, 3, today, today, 4);
        assert_eq!(
            r,
            QuotaReservation {
                granted: 2,
                sent_today: 5,
                remaining: 0
            }
        );

        let r = reserve_quota(Tier::Pro, 10, today, today, 3);
        assert_eq!((r.granted, r.sent_today, r.remaining), (3, 13, 37));
    }

    #[test]
    fn test_second_reservation_sees_the_first() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let first = reserve_quota(Tier::Free, 0, today, today, 5);
        assert_eq!(first.granted, 5);

        let second = reserve_quota(Tier::Free, first.sent_today, today, today, 5);
        assert_eq!(second.granted, 0);
        assert_eq!(second.sent_today, 5);
    }

    #[test]
    fn test_reservation_restarts_stale_counter() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let r = reserve_quota(Tier::Free, 5, yesterday, today, 2);
        assert_eq!((r.granted, r.sent_today, r.remaining), (2, 2, 3));

        let r = reserve_quota(Tier::Free, 9, today, today, 1);
        assert_eq!((r.granted, r.sent_today, r.remaining), (0, 9, 0));
    }

    #[test]
    fn test_tier_serde_uses_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&Tier::ProMax).unwrap(), "\"PRO_MAX\"");
    }
}
