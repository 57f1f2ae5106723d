//! Session tombstones written at logout.
//!
//! A tombstone's existence is all that matters. Its TTL is never shorter than
//! the refresh horizon, so it outlives every token that names the session.

use std::time::Duration;

use crate::store::{SharedStore, StoreError};

/// Tombstone value; readers only check for existence.
const TOMBSTONE: &str = "1";

/// Store key for a session's tombstone.
pub fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

pub struct SessionRevocationStore {
    store: SharedStore,
    refresh_ttl: Duration,
}

impl SessionRevocationStore {
    pub fn new(store: SharedStore, refresh_ttl: Duration) -> Self {
        Self { store, refresh_ttl }
    }

    /// True if the session has been revoked. Always asks the store.
    pub async fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        self.store.exists(&session_key(session_id)).await
    }

    /// Write a tombstone for `session_id`. TTLs shorter than the refresh
    /// horizon are raised to it. Revoking twice is not an error.
    pub async fn revoke(&self, session_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl = ttl.max(self.refresh_ttl);
        self.store
            .set_with_ttl(&session_key(session_id), TOMBSTONE, ttl)
            .await?;
        tracing::info!(session_id, ttl_secs = ttl.as_secs(), "Session revoked");
        Ok(())
    }

    /// Revoke with the refresh horizon as TTL.
    pub async fn revoke_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.revoke(session_id, self.refresh_ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    const HORIZON: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    #[test]
    fn test_session_key_scheme() {
        assert_eq!(session_key("abc"), "session:abc");
    }

    #[tokio::test]
    async fn test_revoke_then_exists() {
        let revocations = SessionRevocationStore::new(Arc::new(MemoryStore::new()), HORIZON);

        assert!(!revocations.exists("s1").await.unwrap());
        revocations.revoke_session("s1").await.unwrap();
        assert!(revocations.exists("s1").await.unwrap());
        assert!(!revocations.exists("s2").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let revocations = SessionRevocationStore::new(Arc::new(MemoryStore::new()), HORIZON);

        revocations.revoke_session("s1").await.unwrap();
        revocations.revoke_session("s1").await.unwrap();
        assert!(revocations.exists("s1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_ttl_is_raised_to_horizon() {
        let revocations = SessionRevocationStore::new(Arc::new(MemoryStore::new()), HORIZON);

        revocations
            .revoke("s1", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(revocations.exists("s1").await.unwrap());

        tokio::time::advance(HORIZON).await;
        assert!(!revocations.exists("s1").await.unwrap());
    }
}
