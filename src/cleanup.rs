//! Scheduled purge of expired entries in the in-process store.
//!
//! Redis expires keys on its own; only the memory backend needs this.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::store::MemoryStore;

/// Interval between purge runs.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Run one purge pass, logging the outcome.
pub fn run_purge(store: &MemoryStore) {
    match store.purge_expired() {
        Ok(count) if count > 0 => info!("Purged {} expired store entries", count),
        Ok(_) => {}
        Err(e) => error!("Failed to purge expired store entries: {}", e),
    }
}

/// Spawn a background task that purges the store periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_purge_scheduler(
    store: Arc<MemoryStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            run_purge(&store);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvStore;

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_purges_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_with_ttl("session:a", "1", Duration::from_secs(5))
            .await
            .unwrap();
        store
            .set_with_ttl("session:b", "1", Duration::from_secs(3600))
            .await
            .unwrap();

        let handle = spawn_purge_scheduler(store.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(15)).await;

        assert_eq!(store.get("session:a").unwrap(), None);
        assert_eq!(store.get("session:b").unwrap().as_deref(), Some("1"));
        // The expired entry is gone, not just hidden
        assert_eq!(store.purge_expired().unwrap(), 0);

        handle.abort();
    }
}
