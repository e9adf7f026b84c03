use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MonitorError;

/// Metadata for an active provider-side watch channel, returned by a
/// successful registration.
#[derive(Debug, Clone)]
pub struct WatchChannel {
    /// Opaque handle identifying the channel at the provider.
    pub resource_id: String,
    /// When the provider stops delivering notifications on this channel.
    pub expires_at: DateTime<Utc>,
    /// Cursor marking the point from which future changes are reported.
    pub start_page_token: String,
}

/// Registers (or re-registers) a watch on a resource with the external
/// change-notification provider.
#[async_trait]
pub trait WatchRegistrar: Send + Sync {
    /// Register a watch, returning the new channel metadata.
    ///
    /// Fails with `RegistrationDenied` when the provider rejects the access
    /// token, and `RegistrationFailed` for any other provider or transport
    /// fault. Callers branch on that distinction.
    async fn register(
        &self,
        access_token: &str,
        webhook_url: &str,
        category_id: &str,
    ) -> Result<WatchChannel, MonitorError>;
}

/// Exchanges a long-lived refresh token for a new short-lived access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Mint a new access token. No internal retries; the caller decides
    /// whether to abandon the record for this cycle.
    async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<String, MonitorError>;
}
