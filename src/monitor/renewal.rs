use tracing::{info, warn};

use crate::error::MonitorError;
use crate::provider::{TokenRefresher, WatchRegistrar};
use crate::store::{Subscription, SubscriptionStore};

/// Run the renewal protocol for one subscription.
///
/// Registration is attempted optimistically with the cached access token;
/// only an authorization rejection pays for a refresh round-trip, after which
/// registration is attempted once more. Whichever attempt succeeds, the new
/// expiry and change cursor are written back. Any error abandons the record
/// for this tick; it is still past threshold, so the next tick retries.
pub(crate) async fn renew(
    registrar: &dyn WatchRegistrar,
    refresher: &dyn TokenRefresher,
    store: &dyn SubscriptionStore,
    sub: &Subscription,
) -> Result<(), MonitorError> {
    sub.validate()?;

    let channel = match registrar
        .register(&sub.access_token, &sub.webhook_url, &sub.category_id)
        .await
    {
        Ok(channel) => channel,
        Err(e) if e.is_auth_failure() => {
            warn!(
                "Access token rejected for {}; refreshing: {e}",
                sub.resource_id
            );
            let access_token = refresher
                .refresh(&sub.client_id, &sub.client_secret, &sub.refresh_token)
                .await?;
            registrar
                .register(&access_token, &sub.webhook_url, &sub.category_id)
                .await?
        }
        Err(e) => return Err(e),
    };

    // A store failure here leaves the provider-side channel active but
    // unrecorded; the stored expiry stays stale, so the next tick simply
    // re-registers. Registration is idempotent provider-side.
    store
        .persist_renewal(
            &sub.category_id,
            &sub.id,
            channel.expires_at,
            &channel.start_page_token,
        )
        .await?;

    info!(
        "Renewed watch for {} in {} (expires {})",
        sub.resource_id, sub.category_id, channel.expires_at
    );

    Ok(())
}
