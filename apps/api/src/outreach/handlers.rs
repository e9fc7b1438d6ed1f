//! Axum route handlers for the Outreach API.

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gmail::tokens::authorized_sender;
use crate::models::outreach::{EmailTemplateRow, EmailTrackingRow};
use crate::models::recruiter::RecruiterRow;
use crate::outreach::cooldown::{
    active_blocks, cooldown_until, load_active_cooldowns, record_cooldown,
};
use crate::outreach::sender::{
    deliver, plan_sends, Delivered, DeliveryLog, Draft, FailedSend, SkippedRecipient,
};
use crate::profiles::{fetch_profile, release_sends, reserve_sends};
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::tiers::{remaining_quota, Tier};

const HISTORY_LIMIT: i64 = 200;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub user_id: Uuid,
    pub recruiter_ids: Vec<Uuid>,
    /// Saved template to start from; `subject`/`body` override its fields.
    pub template_id: Option<Uuid>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendSummary {
    pub requested: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: Vec<SkippedRecipient>,
    pub failures: Vec<FailedSend>,
    pub remaining_quota: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub user_id: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn resolve_draft(pool: &PgPool, request: &SendRequest) -> Result<Draft, AppError> {
    let subject = non_blank(request.subject.clone());
    let body = non_blank(request.body.clone());

    let template = match request.template_id {
        Some(template_id) => Some(
            sqlx::query_as::<_, EmailTemplateRow>(
                "SELECT * FROM email_templates WHERE id = $1 AND user_id = $2",
            )
            .bind(template_id)
            .bind(request.user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Email template {template_id} not found")))?,
        ),
        None => None,
    };

    match (subject, body, template) {
        (Some(subject), Some(body), _) => Ok(Draft { subject, body }),
        (subject, body, Some(t)) => Ok(Draft {
            subject: subject.unwrap_or(t.subject),
            body: body.unwrap_or(t.body),
        }),
        _ => Err(AppError::Validation(
            "subject and body are required when no template_id is given".to_string(),
        )),
    }
}

/// Writes the tracking row, cooldown and conversation thread for one delivered
/// message in a single transaction. The daily counter was already charged when
/// the send slots were reserved.
struct PgDeliveryLog {
    pool: PgPool,
    user_id: Uuid,
    blocked_until: DateTime<Utc>,
    now: DateTime<Utc>,
}

#[async_trait]
impl DeliveryLog for PgDeliveryLog {
    async fn record(&self, delivered: &Delivered) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO email_tracking
                (user_id, recruiter_id, subject, status, gmail_message_id, gmail_thread_id, sent_at)
            VALUES ($1, $2, $3, 'sent', $4, $5, $6)
            "#,
        )
        .bind(self.user_id)
        .bind(delivered.recruiter_id)
        .bind(&delivered.subject)
        .bind(&delivered.message.message_id)
        .bind(delivered.message.thread_id.as_deref())
        .bind(self.now)
        .execute(&mut *tx)
        .await?;

        record_cooldown(&mut *tx, self.user_id, delivered.recruiter_id, self.blocked_until).await?;

        let thread_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO conversation_threads (user_id, recruiter_id, subject, gmail_thread_id, last_message_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(self.user_id)
        .bind(delivered.recruiter_id)
        .bind(&delivered.subject)
        .bind(delivered.message.thread_id.as_deref())
        .bind(self.now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO conversation_messages (thread_id, direction, body, sent_at) VALUES ($1, 'outbound', $2, $3)",
        )
        .bind(thread_id)
        .bind(&delivered.html_body)
        .bind(self.now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}

fn daily_limit_reached(tier: Tier) -> AppError {
    AppError::TooManyRequests(format!(
        "Daily limit of {} emails reached for the {} tier",
        tier.daily_send_limit(),
        tier.as_str()
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/outreach/send
///
/// Sends one email per eligible recruiter through the user's Gmail account.
/// Ineligible recipients are reported back, never treated as an error.
pub async fn handle_send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendSummary>, AppError> {
    if request.recruiter_ids.is_empty() {
        return Err(AppError::Validation("recruiter_ids cannot be empty".to_string()));
    }
    let has_text =
        non_blank(request.subject.clone()).is_some() && non_blank(request.body.clone()).is_some();
    if request.template_id.is_none() && !has_text {
        return Err(AppError::Validation(
            "subject and body are required when no template_id is given".to_string(),
        ));
    }

    let now = Utc::now();
    let profile = fetch_profile(&state.db, request.user_id).await?;
    let tier = profile.tier_at(now);
    let remaining = remaining_quota(
        tier,
        profile.emails_sent_today,
        profile.emails_counter_date,
        now.date_naive(),
    );
    if remaining == 0 {
        return Err(daily_limit_reached(tier));
    }

    let draft = resolve_draft(&state.db, &request).await?;

    let mailer = authorized_sender(
        &state.db,
        &state.gmail,
        request.user_id,
        profile.full_name.as_deref(),
        now,
    )
    .await?
    .ok_or_else(|| AppError::Forbidden("Connect a Gmail account before sending".to_string()))?;

    let recruiters =
        sqlx::query_as::<_, RecruiterRow>("SELECT * FROM recruiters WHERE id = ANY($1)")
            .bind(&request.recruiter_ids[..])
            .fetch_all(&state.db)
            .await?;
    let cooldowns = load_active_cooldowns(&state.db, request.user_id, now).await?;
    let blocks = active_blocks(&cooldowns, now);

    let mut plan = plan_sends(tier, remaining, &request.recruiter_ids, &recruiters, &blocks, now);
    let wanted = plan.eligible.len() as u32;

    // The counter is charged before any mail leaves; unused slots are handed back below.
    let reservation =
        reserve_sends(&state.db, request.user_id, tier, wanted, now.date_naive()).await?;
    if reservation.granted < wanted {
        if reservation.granted == 0 {
            return Err(daily_limit_reached(tier));
        }
        plan = plan_sends(
            tier,
            reservation.granted,
            &request.recruiter_ids,
            &recruiters,
            &blocks,
            now,
        );
    }

    let log = PgDeliveryLog {
        pool: state.db.clone(),
        user_id: request.user_id,
        blocked_until: cooldown_until(now, state.config.outreach_cooldown_days),
        now,
    };
    let report = deliver(&mailer, &log, &plan.eligible, &draft, mailer.identity()).await;

    let mut quota_left = reservation.remaining;
    let unused = reservation.granted.saturating_sub(report.delivered.len() as u32);
    if unused > 0 {
        match release_sends(&state.db, request.user_id, unused, now.date_naive()).await {
            Ok(()) => quota_left += unused,
            Err(e) => error!(
                "Could not return {unused} unused send slots for user {}: {e}",
                request.user_id
            ),
        }
    }

    info!(
        "Outreach for user {}: {} sent, {} failed, {} skipped, {} unrecorded",
        request.user_id,
        report.delivered.len(),
        report.failed.len(),
        plan.skipped.len(),
        report.unrecorded.len()
    );

    Ok(Json(SendSummary {
        requested: request.recruiter_ids.len(),
        sent: report.delivered.len(),
        failed: report.failed.len(),
        skipped: plan.skipped,
        failures: report.failed,
        remaining_quota: quota_left,
    }))
}

/// GET /api/v1/outreach/history?user_id=
pub async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<EmailTrackingRow>>, AppError> {
    let rows = sqlx::query_as::<_, EmailTrackingRow>(
        "SELECT * FROM email_tracking WHERE user_id = $1 ORDER BY sent_at DESC LIMIT $2",
    )
    .bind(params.user_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/email-templates?user_id=
pub async fn handle_list_templates(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<EmailTemplateRow>>, AppError> {
    let rows = sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT * FROM email_templates WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/v1/email-templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<EmailTemplateRow>, AppError> {
    for (field, value) in [
        ("name", &request.name),
        ("subject", &request.subject),
        ("body", &request.body),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} cannot be empty")));
        }
    }
    fetch_profile(&state.db, request.user_id).await?;

    let row = sqlx::query_as::<_, EmailTemplateRow>(
        r#"
        INSERT INTO email_templates (user_id, name, subject, body)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(request.user_id)
    .bind(request.name.trim())
    .bind(&request.subject)
    .bind(&request.body)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row))
}
