use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::services::GigLifecycle;

/// Run the expiry sweep every `every`, starting immediately.
pub fn spawn_expiry_sweep(gigs: GigLifecycle, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Starting gig expiry sweep");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = gigs.expire_sweep().await {
                error!(error = %e, "Expiry sweep failed");
            }
        }
    })
}
