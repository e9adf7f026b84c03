use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use webhook_monitor::crypto::TokenCipher;
use webhook_monitor::monitor::{renewal_daemon, Monitor};
use webhook_monitor::provider::{DriveRegistrar, OAuthRefresher};
use webhook_monitor::store::PostgresStore;
use webhook_monitor::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhook_monitor=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("webhook-monitor v{}", env!("CARGO_PKG_VERSION"));

    let cipher = TokenCipher::new(&config.master_key)?;
    let store = PostgresStore::new(&config.database_url, cipher).await?;
    store.migrate().await?;
    info!("Database connected and migrated ✓");

    let registrar = DriveRegistrar::new().with_api_base(config.drive_api_base.clone());
    let refresher = OAuthRefresher::new().with_token_url(config.oauth_token_url.clone());

    let monitor = Arc::new(Monitor::new(
        Arc::new(store),
        Arc::new(registrar),
        Arc::new(refresher),
    ));

    renewal_daemon(monitor).await;

    Ok(())
}
