//! Gmail integration: the OAuth consent flow, token refresh and message send.
//!
//! Every call to Google goes through `GmailClient`. Stored credentials live in
//! `gmail_tokens` (see `tokens`), and `GmailSender` plugs a connected account
//! into the outreach send loop.

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::outreach::sender::SentMessage;

pub mod handlers;
pub mod mime;
pub mod tokens;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SEND_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const SCOPES: &str =
    "https://www.googleapis.com/auth/gmail.send https://www.googleapis.com/auth/userinfo.email";

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No refresh token stored for this account; reconnect Gmail")]
    MissingRefreshToken,
}

impl From<GmailError> for AppError {
    fn from(e: GmailError) -> Self {
        match e {
            GmailError::MissingRefreshToken => AppError::Forbidden(e.to_string()),
            GmailError::Api { status: 400 | 401, .. } => {
                AppError::Unauthorized(format!("Gmail rejected the credentials: {e}"))
            }
            other => AppError::Gateway(other.to_string()),
        }
    }
}

/// Token endpoint response for both code exchange and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Only present on the first consent (and not always on refresh).
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    id: String,
    thread_id: Option<String>,
}

#[derive(Clone)]
pub struct GmailClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GmailClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Consent screen URL. `state` comes back untouched on the callback.
    pub fn authorization_url(&self, state: &str) -> anyhow::Result<String> {
        let url = Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GmailError> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let tokens: TokenResponse = check(response).await?.json().await?;
        debug!("Exchanged OAuth code (expires in {}s)", tokens.expires_in);
        Ok(tokens)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GmailError> {
        if refresh_token.is_empty() {
            return Err(GmailError::MissingRefreshToken);
        }
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Address of the account the access token belongs to.
    pub async fn fetch_address(&self, access_token: &str) -> Result<String, GmailError> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await?;
        let info: UserInfo = check(response).await?.json().await?;
        Ok(info.email)
    }

    /// Posts an already base64url-encoded RFC 5322 message.
    pub async fn send_raw(&self, access_token: &str, raw: &str) -> Result<SentMessage, GmailError> {
        let response = self
            .client
            .post(SEND_ENDPOINT)
            .bearer_auth(access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await?;
        let sent: SendResponse = check(response).await?.json().await?;
        Ok(SentMessage {
            message_id: sent.id,
            thread_id: sent.thread_id,
        })
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, GmailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    warn!("Google API returned {status}: {message}");
    Err(GmailError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GmailClient {
        GmailClient::new(
            "client-123".to_string(),
            "secret".to_string(),
            "http://localhost:8080/api/v1/gmail/callback".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_requests_offline_send_scope() {
        let url = Url::parse(&client().authorization_url("abc123").unwrap()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["state"], "abc123");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert!(params["scope"].contains("gmail.send"));
        assert_eq!(params["redirect_uri"], "http://localhost:8080/api/v1/gmail/callback");
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_fast() {
        let err = client().refresh("").await.unwrap_err();
        assert!(matches!(err, GmailError::MissingRefreshToken));
    }

    #[test]
    fn test_token_response_without_refresh_token() {
        let tokens: TokenResponse =
            serde_json::from_str(r#"{"access_token":"ya29","expires_in":3599,"token_type":"Bearer"}"#)
                .unwrap();
        assert_eq!(tokens.expires_in, 3599);
        assert!(tokens.refresh_token.is_none());
    }

    #[test]
    fn test_revoked_credentials_map_to_unauthorized() {
        let err: AppError = GmailError::Api {
            status: 401,
            message: "invalid_grant".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
