use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::traits::{WatchChannel, WatchRegistrar};
use crate::error::MonitorError;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive push-channel registrar.
///
/// Registration is two calls: fetch the current change cursor
/// (`changes/startPageToken`), then open a channel on the whole Drive
/// (`files/root/watch`). Channel lifetime is capped by Google at ~1 week;
/// the monitor re-registers well before that.
pub struct DriveRegistrar {
    api_base: String,
    http: reqwest::Client,
}

// Raw response from changes/startPageToken
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPageTokenResponse {
    start_page_token: String,
}

// Raw response from files/root/watch. Google reports expiration as
// epoch milliseconds in a string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchResponse {
    resource_id: String,
    expiration: String,
}

impl DriveRegistrar {
    pub fn new() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Point the registrar at a different API base (used by contract tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Map a non-success status, separating token rejection from other faults.
    fn status_error(context: &str, status: StatusCode, body: String) -> MonitorError {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            MonitorError::RegistrationDenied(format!("{context}: {status}: {body}"))
        } else {
            MonitorError::RegistrationFailed(format!("{context}: {status}: {body}"))
        }
    }
}

impl Default for DriveRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WatchRegistrar for DriveRegistrar {
    async fn register(
        &self,
        access_token: &str,
        webhook_url: &str,
        category_id: &str,
    ) -> Result<WatchChannel, MonitorError> {
        // Retrieve the startPageToken to track future changes
        let resp = self
            .http
            .get(format!("{}/changes/startPageToken", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                MonitorError::RegistrationFailed(format!("Start page token request failed: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_error("Start page token fetch", status, body));
        }

        let start_token: StartPageTokenResponse = resp.json().await.map_err(|e| {
            MonitorError::RegistrationFailed(format!("Failed to parse start page token: {e}"))
        })?;

        // Register the channel. The channel id only needs to be unique per
        // channel; the category rides in the opaque `token` field so inbound
        // notifications can be attributed to it.
        let channel_id = format!("webhook-{}", Utc::now().timestamp_millis());

        let resp = self
            .http
            .post(format!("{}/files/root/watch", self.api_base))
            .bearer_auth(access_token)
            .json(&json!({
                "id": channel_id,
                "type": "web_hook",
                "address": webhook_url,
                "token": category_id,
            }))
            .send()
            .await
            .map_err(|e| MonitorError::RegistrationFailed(format!("Watch request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_error("Watch registration", status, body));
        }

        let watch: WatchResponse = resp.json().await.map_err(|e| {
            MonitorError::RegistrationFailed(format!("Failed to parse watch response: {e}"))
        })?;

        let expiration_ms: i64 = watch.expiration.parse().map_err(|_| {
            MonitorError::RegistrationFailed(format!(
                "Invalid expiration in watch response: {:?}",
                watch.expiration
            ))
        })?;

        let expires_at = Utc.timestamp_millis_opt(expiration_ms).single().ok_or_else(|| {
            MonitorError::RegistrationFailed(format!(
                "Expiration out of range: {expiration_ms}"
            ))
        })?;

        Ok(WatchChannel {
            resource_id: watch.resource_id,
            expires_at,
            start_page_token: start_token.start_page_token,
        })
    }
}
