//! Subscription store: record model, store contract, PostgreSQL backend.

pub mod postgres;

pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MonitorError;

/// One tracked webhook subscription, owned exclusively by the store.
///
/// Created by the registration service; this monitor only reads records and
/// updates their renewal fields.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub category_id: String,
    /// Handle of the currently recorded provider-side channel.
    pub resource_id: String,
    pub webhook_url: String,
    /// Short-lived credential; possibly stale by the time we use it.
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub webhook_expiry: DateTime<Utc>,
    pub start_page_token: String,
}

impl Subscription {
    /// Reject records missing the fields the renewal protocol depends on.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let required = [
            ("access_token", &self.access_token),
            ("refresh_token", &self.refresh_token),
            ("webhook_url", &self.webhook_url),
            ("category_id", &self.category_id),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(MonitorError::Validation(format!(
                    "subscription {} is missing {field}",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Durable store for subscription records.
///
/// Renewal writes are field-level (expiry + cursor only), never full-record
/// overwrites; unrelated fields must survive concurrent writers.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All categories with at least one tracked record.
    async fn list_categories(&self) -> Result<Vec<String>, MonitorError>;

    /// Records in `category` whose expiry is strictly before `before`.
    async fn find_expiring(
        &self,
        category: &str,
        before: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, MonitorError>;

    /// Record a successful renewal: update expiry and change cursor.
    async fn persist_renewal(
        &self,
        category: &str,
        id: &str,
        expiry: DateTime<Utc>,
        start_page_token: &str,
    ) -> Result<(), MonitorError>;
}
