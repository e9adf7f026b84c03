use async_trait::async_trait;
use serde::Deserialize;

use super::traits::TokenRefresher;
use crate::error::MonitorError;

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 refresh-grant client for the Google token endpoint.
pub struct OAuthRefresher {
    token_url: String,
    http: reqwest::Client,
}

// Raw token response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OAuthRefresher {
    pub fn new() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Point the refresher at a different token endpoint (used by tests).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl Default for OAuthRefresher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<String, MonitorError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| MonitorError::RefreshFailed(format!("Refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MonitorError::RefreshFailed(format!(
                "Token endpoint rejected refresh: {body}"
            )));
        }

        let token_resp: TokenResponse = resp.json().await.map_err(|e| {
            MonitorError::RefreshFailed(format!("Failed to parse refresh response: {e}"))
        })?;

        Ok(token_resp.access_token)
    }
}
