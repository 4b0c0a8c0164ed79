//! Periodic removal of dead verification codes.

use crate::models::otp::OtpStore;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Purge expired and used codes from `otp_store` every `interval`,
/// until `token` is cancelled.
pub async fn sweep_otp_store(otp_store: Arc<OtpStore>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let purged = otp_store.purge(Utc::now());
                if purged > 0 {
                    tracing::debug!(purged, remaining = otp_store.len(), "swept verification codes");
                }
            }
        }
    }

    tracing::debug!("verification code sweeper stopped");
}
