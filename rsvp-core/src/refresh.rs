//! Keeping the OAuth credentials fresh.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::channel::CredentialRefresher;
use crate::error::RsvpResult;
use crate::state::{Credentials, StateStore};

/// Refresh once the access token has less than this left.
pub const REFRESH_MARGIN_MINUTES: i64 = 60;

/// Whether `credentials` should be refreshed at `now`.
pub fn is_refresh_due(credentials: &Credentials, now: DateTime<Utc>) -> bool {
    if credentials.refresh_token.is_empty() {
        return false;
    }
    match credentials.expires_at {
        Some(expires_at) => expires_at - now < Duration::minutes(REFRESH_MARGIN_MINUTES),
        None => true,
    }
}

/// Refresh the stored credentials if they are about to expire.
///
/// Returns true if new credentials were stored. A failed refresh is logged and
/// left for the next tick; only failing to persist new credentials is an error.
pub async fn refresh_if_due(
    store: &StateStore,
    refresher: &dyn CredentialRefresher,
    now: DateTime<Utc>,
) -> RsvpResult<bool> {
    let current = store.credentials().await;
    if !is_refresh_due(&current, now) {
        return Ok(false);
    }

    match refresher.refresh(&current).await {
        Ok(credentials) => {
            store.set_credentials(credentials).await?;
            info!("Access token was refreshed");
            Ok(true)
        }
        Err(e) => {
            warn!(error = %e, "Could not refresh access token");
            Ok(false)
        }
    }
}
