//! Stored Gmail credentials and the `Mailer` built from them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gmail::mime::{build_message, encode_raw};
use crate::gmail::{GmailClient, GmailError, TokenResponse};
use crate::models::outreach::GmailTokenRow;
use crate::outreach::compose::SenderIdentity;
use crate::outreach::sender::{Mailer, OutgoingEmail, SentMessage};

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

pub fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at - Duration::seconds(REFRESH_MARGIN_SECS) <= now
}

pub fn expiry_from(tokens: &TokenResponse, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(tokens.expires_in.max(0))
}

pub async fn load_tokens(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<GmailTokenRow>, sqlx::Error> {
    sqlx::query_as::<_, GmailTokenRow>("SELECT * FROM gmail_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Inserts or replaces the user's credentials. An absent refresh token keeps the stored one.
pub async fn store_tokens(
    pool: &PgPool,
    user_id: Uuid,
    gmail_address: &str,
    tokens: &TokenResponse,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO gmail_tokens (user_id, gmail_address, access_token, refresh_token, expires_at, updated_at)
        VALUES ($1, $2, $3, COALESCE($4, ''), $5, $6)
        ON CONFLICT (user_id) DO UPDATE SET
            gmail_address = EXCLUDED.gmail_address,
            access_token  = EXCLUDED.access_token,
            refresh_token = COALESCE(NULLIF($4, ''), gmail_tokens.refresh_token),
            expires_at    = EXCLUDED.expires_at,
            updated_at    = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .bind(gmail_address)
    .bind(&tokens.access_token)
    .bind(tokens.refresh_token.as_deref())
    .bind(expiry_from(tokens, now))
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

async fn update_access_token(
    pool: &PgPool,
    user_id: Uuid,
    tokens: &TokenResponse,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE gmail_tokens
        SET access_token = $2,
            refresh_token = COALESCE(NULLIF($3, ''), refresh_token),
            expires_at = $4,
            updated_at = $5
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(&tokens.access_token)
    .bind(tokens.refresh_token.as_deref())
    .bind(expiry_from(tokens, now))
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns whether a row was removed.
pub async fn delete_tokens(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM gmail_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// A connected Gmail account holding a usable access token.
pub struct GmailSender {
    client: GmailClient,
    access_token: String,
    identity: SenderIdentity,
}

impl GmailSender {
    pub fn identity(&self) -> &SenderIdentity {
        &self.identity
    }
}

#[async_trait]
impl Mailer for GmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentMessage, GmailError> {
        let message = build_message(&self.identity, &email.to, &email.subject, &email.html_body);
        self.client
            .send_raw(&self.access_token, &encode_raw(&message))
            .await
    }
}

/// Loads the user's credentials, refreshing the access token when it is about to lapse.
/// `None` when no Gmail account is connected.
pub async fn authorized_sender(
    pool: &PgPool,
    client: &GmailClient,
    user_id: Uuid,
    display_name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<GmailSender>, AppError> {
    let Some(row) = load_tokens(pool, user_id).await? else {
        return Ok(None);
    };

    let access_token = if needs_refresh(row.expires_at, now) {
        let refreshed = client.refresh(&row.refresh_token).await?;
        update_access_token(pool, user_id, &refreshed, now).await?;
        info!("Refreshed Gmail access token for user {user_id}");
        refreshed.access_token
    } else {
        row.access_token
    };

    let name = display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(row.gmail_address.as_str())
        .to_string();

    Ok(Some(GmailSender {
        client: client.clone(),
        access_token,
        identity: SenderIdentity {
            name,
            email: row.gmail_address,
        },
    }))
}
