//! Automatic event retention: events are removed a fixed window after they
//! end, matching the original product's TTL behavior, but through the
//! cascading delete path so nothing is stranded.

use chrono::{DateTime, Duration, Utc};
use soiree_db::DbPool;

/// How long a finished event stays around.
pub const RETENTION_DAYS: i64 = 14;

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

/// Run the expiry sweep once.
pub async fn sweep(db: &DbPool) {
    let cutoff = retention_cutoff(Utc::now());
    match soiree_db::events::purge_expired(db, cutoff).await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "expired events removed"),
        Err(e) => tracing::warn!("event expiry sweep failed: {e}"),
    }
}

/// Spawn the hourly sweep loop for the lifetime of the process.
pub fn spawn_sweeper(db: DbPool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweep(&db).await;
        }
    })
}
