//! Deadline enforcement for store calls.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::{KvStore, SharedStore, StoreError};

/// Wraps a store so no call can outlive `deadline`.
pub struct TimedStore {
    inner: SharedStore,
    deadline: Duration,
}

impl TimedStore {
    pub fn new(inner: SharedStore, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.deadline)),
        }
    }
}

#[async_trait]
impl KvStore for TimedStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.bounded(self.inner.exists(key)).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.bounded(self.inner.set_with_ttl(key, value, ttl)).await
    }

    async fn slide_window(
        &self,
        key: &str,
        interval_ms: u64,
        rate: u64,
        now_ms: u64,
    ) -> Result<bool, StoreError> {
        self.bounded(self.inner.slide_window(key, interval_ms, rate, now_ms))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    /// A store whose calls never complete.
    struct HangingStore;

    #[async_trait]
    impl KvStore for HangingStore {
        async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
            std::future::pending().await
        }

        async fn set_with_ttl(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn slide_window(
            &self,
            _key: &str,
            _interval_ms: u64,
            _rate: u64,
            _now_ms: u64,
        ) -> Result<bool, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_store_times_out() {
        let store = TimedStore::new(Arc::new(HangingStore), Duration::from_millis(50));

        assert!(matches!(
            store.exists("session:x").await,
            Err(StoreError::Timeout(_))
        ));
        assert!(matches!(
            store.slide_window("k", 1000, 1, 0).await,
            Err(StoreError::Timeout(_))
        ));
        assert!(matches!(
            store
                .set_with_ttl("session:x", "1", Duration::from_secs(1))
                .await,
            Err(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_fast_store_passes_through() {
        let store = TimedStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(1));
        store
            .set_with_ttl("session:x", "1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.exists("session:x").await.unwrap());
    }
}
