/// Unified error type for the webhook-monitor service.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    // ── Record Errors ───────────────────────────────────────────────────
    #[error("Invalid subscription record: {0}")]
    Validation(String),

    // ── Authority Errors ────────────────────────────────────────────────
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    // ── Provider Errors ─────────────────────────────────────────────────
    #[error("Watch registration rejected: {0}")]
    RegistrationDenied(String),

    #[error("Watch registration failed: {0}")]
    RegistrationFailed(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl MonitorError {
    /// True when the provider rejected our access token (401/403).
    ///
    /// This is the only failure that warrants a credential refresh; provider
    /// or network faults must not be masked as auth problems.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, MonitorError::RegistrationDenied(_))
    }
}

impl From<sqlx::Error> for MonitorError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        MonitorError::Database(e.to_string())
    }
}
