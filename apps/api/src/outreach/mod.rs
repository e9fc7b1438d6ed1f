// Outreach: per-recipient composition, eligibility planning and the Gmail send loop.

pub mod compose;
pub mod cooldown;
pub mod handlers;
pub mod sender;
