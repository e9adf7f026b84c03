use anyhow::{Context, Result};

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Database (PostgreSQL, shared with the registration service) ─────
    pub database_url: String,

    // ── Crypto ──────────────────────────────────────────────────────────
    /// 32-byte base64-encoded master key for AES-256-GCM token encryption.
    pub master_key: String,

    // ── Google endpoints (overridable for tests) ────────────────────────
    pub drive_api_base: String,
    pub oauth_token_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL is required (PostgreSQL connection string)")?,
            master_key: std::env::var("MASTER_KEY")
                .context("MASTER_KEY is required (32 bytes, base64)")?,

            drive_api_base: std::env::var("DRIVE_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".into()),
            oauth_token_url: std::env::var("OAUTH_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".into()),
        })
    }
}
