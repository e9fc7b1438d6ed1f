use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::gmail::GmailClient;
use crate::llm_client::LlmClient;
use crate::payments::RazorpayClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Holds short-lived OAuth state nonces.
    pub redis: RedisClient,
    /// Resume uploads.
    pub s3: S3Client,
    pub llm: LlmClient,
    pub gmail: GmailClient,
    pub razorpay: RazorpayClient,
    pub config: Config,
}
