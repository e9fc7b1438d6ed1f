//! Axum route handlers for connecting and disconnecting a Gmail account.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gmail::tokens::{delete_tokens, load_tokens, store_tokens};
use crate::profiles::fetch_profile;
use crate::routes::UserIdQuery;
use crate::state::AppState;

const STATE_TTL_SECS: u64 = 600;
const STATE_LEN: usize = 32;

fn state_key(state: &str) -> String {
    format!("gmail_oauth:{state}")
}

fn new_state() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub authorization_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub gmail_address: Option<String>,
}

/// GET /api/v1/gmail/authorize?user_id=
pub async fn handle_authorize(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    fetch_profile(&state.db, params.user_id).await?;

    let nonce = new_state();
    let mut conn = state.redis.get_multiplexed_async_connection().await?;
    redis::cmd("SET")
        .arg(state_key(&nonce))
        .arg(params.user_id.to_string())
        .arg("EX")
        .arg(STATE_TTL_SECS)
        .query_async::<_, ()>(&mut conn)
        .await?;

    Ok(Json(AuthorizeResponse {
        authorization_url: state.gmail.authorization_url(&nonce)?,
    }))
}

/// GET /api/v1/gmail/callback?code=&state=
///
/// The state nonce is single-use; a replayed or expired one is rejected.
pub async fn handle_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<ConnectionStatus>, AppError> {
    if let Some(error) = params.error {
        return Err(AppError::Validation(format!("Google declined the consent: {error}")));
    }
    let (Some(code), Some(nonce)) = (params.code, params.state) else {
        return Err(AppError::Validation("code and state are required".to_string()));
    };

    let mut conn = state.redis.get_multiplexed_async_connection().await?;
    let owner: Option<String> = redis::cmd("GETDEL")
        .arg(state_key(&nonce))
        .query_async(&mut conn)
        .await?;
    let user_id = owner
        .and_then(|s| Uuid::parse_str(&s).ok())
        .ok_or_else(|| AppError::Unauthorized("OAuth state is unknown or expired".to_string()))?;

    let tokens = state.gmail.exchange_code(&code).await?;
    let gmail_address = state.gmail.fetch_address(&tokens.access_token).await?;
    store_tokens(&state.db, user_id, &gmail_address, &tokens, Utc::now()).await?;

    info!("Connected Gmail account for user {user_id}");
    Ok(Json(ConnectionStatus {
        connected: true,
        gmail_address: Some(gmail_address),
    }))
}

/// GET /api/v1/gmail/status?user_id=
pub async fn handle_status(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ConnectionStatus>, AppError> {
    let row = load_tokens(&state.db, params.user_id).await?;
    Ok(Json(ConnectionStatus {
        connected: row.is_some(),
        gmail_address: row.map(|r| r.gmail_address),
    }))
}

/// POST /api/v1/gmail/disconnect?user_id=
pub async fn handle_disconnect(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ConnectionStatus>, AppError> {
    if delete_tokens(&state.db, params.user_id).await? {
        info!("Disconnected Gmail account for user {}", params.user_id);
    }
    Ok(Json(ConnectionStatus {
        connected: false,
        gmail_address: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_random_alphanumeric() {
        let a = new_state();
        let b = new_state();
        assert_eq!(a.len(), STATE_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_key_is_namespaced() {
        assert_eq!(state_key("xyz"), "gmail_oauth:xyz");
    }
}
