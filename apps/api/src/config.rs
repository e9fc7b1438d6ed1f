use anyhow::{ensure, Context, Result};

use crate::outreach::cooldown::MAX_COOLDOWN_DAYS;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub gemini_api_key: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    /// Days a recruiter stays blocked for a user after a successful send.
    pub outreach_cooldown_days: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let outreach_cooldown_days = parse_cooldown_days(
            &std::env::var("OUTREACH_COOLDOWN_DAYS").unwrap_or_else(|_| "7".to_string()),
        )?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            razorpay_key_id: require_env("RAZORPAY_KEY_ID")?,
            razorpay_key_secret: require_env("RAZORPAY_KEY_SECRET")?,
            google_client_id: require_env("GOOGLE_CLIENT_ID")?,
            google_client_secret: require_env("GOOGLE_CLIENT_SECRET")?,
            google_redirect_uri: require_env("GOOGLE_REDIRECT_URI")?,
            outreach_cooldown_days,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_cooldown_days(raw: &str) -> Result<i64> {
    let days = raw
        .trim()
        .parse::<i64>()
        .context("OUTREACH_COOLDOWN_DAYS must be a whole number of days")?;
    ensure!(
        (0..=MAX_COOLDOWN_DAYS).contains(&days),
        "OUTREACH_COOLDOWN_DAYS must be between 0 and {MAX_COOLDOWN_DAYS}, got {days}"
    );
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_days_accepts_sane_range() {
        assert_eq!(parse_cooldown_days("7").unwrap(), 7);
        assert_eq!(parse_cooldown_days(" 0 ").unwrap(), 0);
        assert_eq!(parse_cooldown_days("3650").unwrap(), MAX_COOLDOWN_DAYS);
    }

    #[test]
    fn test_cooldown_days_rejects_out_of_range() {
        assert!(parse_cooldown_days("-1").is_err());
        assert!(parse_cooldown_days("3651").is_err());
        assert!(parse_cooldown_days("100000000").is_err());
        assert!(parse_cooldown_days("a week").is_err());
    }
}
