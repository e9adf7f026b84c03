//! PostgreSQL-backed subscription store.
//!
//! One row per watched resource in `subscriptions`. Credential columns
//! (`access_token`, `refresh_token`, `client_secret`) are encrypted at rest
//! by the registration service and decrypted here on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::warn;

use super::{Subscription, SubscriptionStore};
use crate::crypto::TokenCipher;
use crate::error::MonitorError;

/// Subscription store backed by PostgreSQL.
pub struct PostgresStore {
    pool: PgPool,
    cipher: TokenCipher,
}

impl PostgresStore {
    pub async fn new(db_url: &str, cipher: TokenCipher) -> Result<Self, MonitorError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(db_url)
            .await
            .map_err(|e| MonitorError::Database(format!("Failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool, cipher })
    }

    /// Run schema migrations.
    pub async fn migrate(&self) -> Result<(), MonitorError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id                UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                category_id       TEXT NOT NULL,
                resource_id       TEXT NOT NULL,
                webhook_url       TEXT NOT NULL,
                access_token      TEXT NOT NULL,
                refresh_token     TEXT NOT NULL,
                client_id         TEXT NOT NULL,
                client_secret     TEXT NOT NULL,
                webhook_expiry    TIMESTAMPTZ NOT NULL,
                start_page_token  TEXT NOT NULL DEFAULT '',
                created_at        TIMESTAMPTZ DEFAULT NOW(),
                updated_at        TIMESTAMPTZ DEFAULT NOW(),
                UNIQUE(category_id, resource_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_expiry ON subscriptions(category_id, webhook_expiry)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Decrypt one row into a `Subscription`.
    fn map_row(&self, row: &sqlx::postgres::PgRow) -> Result<Subscription, MonitorError> {
        let enc_access: String = row.get(4);
        let enc_refresh: String = row.get(5);
        let enc_secret: String = row.get(7);

        Ok(Subscription {
            id: row.get(0),
            category_id: row.get(1),
            resource_id: row.get(2),
            webhook_url: row.get(3),
            access_token: self.cipher.decrypt(&enc_access)?,
            refresh_token: self.cipher.decrypt(&enc_refresh)?,
            client_id: row.get(6),
            client_secret: self.cipher.decrypt(&enc_secret)?,
            webhook_expiry: row.get(8),
            start_page_token: row.get(9),
        })
    }
}

#[async_trait]
impl SubscriptionStore for PostgresStore {
    async fn list_categories(&self) -> Result<Vec<String>, MonitorError> {
        let rows = sqlx::query("SELECT DISTINCT category_id FROM subscriptions ORDER BY category_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn find_expiring(
        &self,
        category: &str,
        before: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, MonitorError> {
        let rows = sqlx::query(
            r#"
            SELECT id::text, category_id, resource_id, webhook_url,
                   access_token, refresh_token, client_id, client_secret,
                   webhook_expiry, start_page_token
            FROM subscriptions
            WHERE category_id = $1 AND webhook_expiry < $2
            "#,
        )
        .bind(category)
        .bind(before)
        .fetch_all(&self.pool)
        .await?;

        // A row that fails to decrypt is logged and skipped; the rest of
        // the category still renews.
        let mut subs = Vec::with_capacity(rows.len());
        for row in &rows {
            match self.map_row(row) {
                Ok(sub) => subs.push(sub),
                Err(e) => {
                    let id: String = row.get(0);
                    warn!("Skipping undecryptable subscription {id}: {e}");
                }
            }
        }

        Ok(subs)
    }

    async fn persist_renewal(
        &self,
        category: &str,
        id: &str,
        expiry: DateTime<Utc>,
        start_page_token: &str,
    ) -> Result<(), MonitorError> {
        let affected = sqlx::query(
            r#"
            UPDATE subscriptions
            SET webhook_expiry = $1,
                start_page_token = $2,
                updated_at = NOW()
            WHERE id = $3::uuid AND category_id = $4
            "#,
        )
        .bind(expiry)
        .bind(start_page_token)
        .bind(id)
        .bind(category)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(MonitorError::Database(format!(
                "No subscription {id} in category {category}"
            )));
        }

        Ok(())
    }
}
