//! Razorpay checkout: order creation and payment signature verification.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::AppError;

pub mod handlers;
pub mod signature;

const ORDERS_ENDPOINT: &str = "https://api.razorpay.com/v1/orders";
/// Razorpay rejects receipts longer than this.
pub const MAX_RECEIPT_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum RazorpayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Razorpay API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<RazorpayError> for AppError {
    fn from(e: RazorpayError) -> Self {
        AppError::Gateway(e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct OrderRequest<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub notes: OrderNotes,
}

#[derive(Debug, Serialize)]
pub struct OrderNotes {
    pub user_id: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            key_id,
            key_secret,
        })
    }

    /// Public key handed to the checkout widget.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_secret(&self) -> &str {
        &self.key_secret
    }

    pub async fn create_order(
        &self,
        order: &OrderRequest<'_>,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let response = self
            .client
            .post(ORDERS_ENDPOINT)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Razorpay order creation returned {status}: {message}");
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: RazorpayOrder = response.json().await?;
        info!("Created Razorpay order {} ({} {})", created.id, created.amount, created.currency);
        Ok(created)
    }
}

/// Receipt reference for an order: `rcpt_<first 8 of user id>_<unix seconds>`.
pub fn receipt_for(user_id: uuid::Uuid, now: DateTime<Utc>) -> String {
    let short = user_id.simple().to_string();
    let mut receipt = format!("rcpt_{}_{}", &short[..8], now.timestamp());
    receipt.truncate(MAX_RECEIPT_LEN);
    receipt
}

/// Paid days stack on top of an active subscription; a lapsed one restarts from now.
/// `None` when the result falls outside the representable date range.
pub fn new_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    duration_days: i32,
) -> Option<DateTime<Utc>> {
    let start = current.filter(|c| *c > now).unwrap_or(now);
    Duration::try_days(i64::from(duration_days.max(0)))
        .and_then(|span| start.checked_add_signed(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_expiry_extends_active_subscription() {
        let now = Utc::now();
        let current = now + Duration::days(10);
        assert_eq!(new_expiry(Some(current), now, 30), Some(current + Duration::days(30)));
    }

    #[test]
    fn test_expiry_restarts_after_lapse() {
        let now = Utc::now();
        assert_eq!(
            new_expiry(Some(now - Duration::days(3)), now, 30),
            Some(now + Duration::days(30))
        );
        assert_eq!(new_expiry(None, now, 30), Some(now + Duration::days(30)));
    }

    #[test]
    fn test_expiry_overflow_is_none() {
        assert_eq!(new_expiry(None, Utc::now(), i32::MAX), None);
    }

    #[test]
    fn test_receipt_fits_razorpay_limit() {
        let receipt = receipt_for(Uuid::new_v4(), Utc::now());
        assert!(receipt.starts_with("rcpt_"));
        assert!(receipt.len() <= MAX_RECEIPT_LEN);
    }

    #[test]
    fn test_order_request_shape() {
        let order = OrderRequest {
            amount: 49_900,
            currency: "INR",
            receipt: "rcpt_1",
            notes: OrderNotes {
                user_id: "u".to_string(),
                plan_id: "p".to_string(),
            },
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["amount"], 49_900);
        assert_eq!(value["notes"]["plan_id"], "p");
    }
}
