//! The compose/send flow: decide who gets an email, then send one message per
//! recipient through a `Mailer`.
//!
//! Sends are sequential with no retry. A failed recipient is logged and
//! counted; the loop moves on to the next one. Each accepted message is
//! handed to a `DeliveryLog` before the next send starts.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gmail::GmailError;
use crate::models::recruiter::RecruiterRow;
use crate::outreach::compose::{recipient_vars, render_template, text_to_html, SenderIdentity};
use crate::outreach::cooldown::is_blocked;
use crate::tiers::{can_access_recruiter, Tier};

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub message_id: String,
    pub thread_id: Option<String>,
}

/// Anything that can deliver one email. Gmail in production, a fake in tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentMessage, GmailError>;
}

/// Persists a delivered message. Called once per accepted send, in order.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn record(&self, delivered: &Delivered) -> Result<(), sqlx::Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    TierLocked,
    CoolingDown { until: DateTime<Utc> },
    QuotaExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecipient {
    pub recruiter_id: Uuid,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct SendPlan<'a> {
    pub eligible: Vec<&'a RecruiterRow>,
    pub skipped: Vec<SkippedRecipient>,
}

/// Splits the requested recipients into those to email now and those to skip.
///
/// Request order is kept and repeated ids are dropped. Once `remaining_quota`
/// recipients are eligible, everyone after them is skipped as `QuotaExhausted`.
pub fn plan_sends<'a>(
    user_tier: Tier,
    remaining_quota: u32,
    requested: &[Uuid],
    recruiters: &'a [RecruiterRow],
    blocks: &HashMap<Uuid, DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SendPlan<'a> {
    let by_id: HashMap<Uuid, &RecruiterRow> = recruiters.iter().map(|r| (r.id, r)).collect();
    let mut seen = HashSet::new();
    let mut plan = SendPlan {
        eligible: Vec::new(),
        skipped: Vec::new(),
    };

    for &recruiter_id in requested {
        if !seen.insert(recruiter_id) {
            continue;
        }

        let reason = match by_id.get(&recruiter_id) {
            None => SkipReason::NotFound,
            Some(r) if !can_access_recruiter(user_tier.as_str(), &r.tier) => SkipReason::TierLocked,
            Some(r) => match blocks.get(&recruiter_id) {
                Some(&until) if is_blocked(until, now) => SkipReason::CoolingDown { until },
                _ if plan.eligible.len() as u32 >= remaining_quota => SkipReason::QuotaExhausted,
                _ => {
                    plan.eligible.push(*r);
                    continue;
                }
            },
        };

        plan.skipped.push(SkippedRecipient {
            recruiter_id,
            reason,
        });
    }

    plan
}

/// Subject and body before per-recipient interpolation.
#[derive(Debug, Clone)]
pub struct Draft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Delivered {
    pub recruiter_id: Uuid,
    pub subject: String,
    pub html_body: String,
    pub message: SentMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedSend {
    pub recruiter_id: Uuid,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<Delivered>,
    pub failed: Vec<FailedSend>,
    /// Delivered recipients whose record could not be written.
    pub unrecorded: Vec<Uuid>,
}

/// Sends the draft to each recipient in order, recording every accepted message.
pub async fn deliver(
    mailer: &dyn Mailer,
    log: &dyn DeliveryLog,
    recipients: &[&RecruiterRow],
    draft: &Draft,
    sender: &SenderIdentity,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for recruiter in recipients {
        let vars = recipient_vars(recruiter, sender);
        let email = OutgoingEmail {
            to: recruiter.email.clone(),
            subject: render_template(&draft.subject, &vars),
            html_body: text_to_html(&render_template(&draft.body, &vars)),
        };

        match mailer.send(&email).await {
            Ok(message) => {
                info!(
                    "Sent outreach to recruiter {} (message {})",
                    recruiter.id, message.message_id
                );
                let delivered = Delivered {
                    recruiter_id: recruiter.id,
                    subject: email.subject,
                    html_body: email.html_body,
                    message,
                };
                if let Err(e) = log.record(&delivered).await {
                    error!(
                        "Outreach to recruiter {} was sent but not recorded: {e}",
                        recruiter.id
                    );
                    report.unrecorded.push(recruiter.id);
                }
                report.delivered.push(delivered);
            }
            Err(e) => {
                warn!("Outreach to recruiter {} failed: {e}", recruiter.id);
                report.failed.push(FailedSend {
                    recruiter_id: recruiter.id,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
