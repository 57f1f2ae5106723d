//! Shared key-value store backing session tombstones and rate-limit windows.
//!
//! Every instance of the server talks to the same store, so all cross-request
//! coordination happens there. The trait exposes only what the auth core needs:
//! an existence check, a write with TTL, and the atomic sliding-window update.

mod memory;
mod redis_store;
mod timed;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use timed::TimedStore;

/// Handle shared by every component that talks to the store.
pub type SharedStore = Arc<dyn KvStore>;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// True if the key is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Write `value` under `key`, expiring after `ttl`. Overwrites silently.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Prune entries at or before `now_ms - interval_ms`, then admit and record
    /// `now_ms` only if fewer than `rate` entries remain. Returns `true` when the
    /// call was limited. The whole sequence must not interleave with other
    /// callers on the same key.
    async fn slide_window(
        &self,
        key: &str,
        interval_ms: u64,
        rate: u64,
        now_ms: u64,
    ) -> Result<bool, StoreError>;
}

/// Errors returned by store backends.
#[derive(Debug)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command
    Unavailable(String),
    /// The call did not complete before its deadline
    Timeout(Duration),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(e) => write!(f, "Store unavailable: {}", e),
            StoreError::Timeout(d) => write!(f, "Store call exceeded {}ms deadline", d.as_millis()),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// A concrete store backend, before deadlines are applied.
#[derive(Clone)]
pub enum Backend {
    Memory(Arc<MemoryStore>),
    Redis(Arc<RedisStore>),
}

impl Backend {
    /// Open the store named by `url`.
    ///
    /// `memory://` selects the in-process store, which is only correct for a single
    /// server instance. Redis URLs are handed to the Redis client.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid store url: {}", e)))?;

        match parsed.scheme() {
            "memory" => Ok(Backend::Memory(Arc::new(MemoryStore::new()))),
            "redis" | "rediss" | "redis+unix" | "unix" => {
                Ok(Backend::Redis(Arc::new(RedisStore::connect(url).await?)))
            }
            other => Err(StoreError::Unavailable(format!(
                "unsupported store scheme: {}",
                other
            ))),
        }
    }

    /// Wrap the backend so every call is bounded by `deadline`.
    pub fn with_deadline(&self, deadline: Duration) -> SharedStore {
        let inner: SharedStore = match self {
            Backend::Memory(store) => store.clone() as SharedStore,
            Backend::Redis(store) => store.clone() as SharedStore,
        };
        Arc::new(TimedStore::new(inner, deadline))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A store whose every call fails as if the backend were unreachable.
    pub(crate) struct DownStore;

    #[async_trait]
    impl KvStore for DownStore {
        async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn set_with_ttl(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn slide_window(
            &self,
            _key: &str,
            _interval_ms: u64,
            _rate: u64,
            _now_ms: u64,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let backend = Backend::open("memory://").await.unwrap();
        assert!(matches!(backend, Backend::Memory(_)));

        let store = backend.with_deadline(Duration::from_millis(100));
        assert!(!store.exists("session:abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let result = Backend::open("postgres://localhost/db").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_garbage_url() {
        let result = Backend::open("not a url").await;
        assert!(result.is_err());
    }
}
