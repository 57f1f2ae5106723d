//! Redis-backed store shared by all server instances.

use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use std::time::Duration;

use super::{KvStore, StoreError};

/// Atomic prune-count-compare-append script for the sliding window.
const SLIDE_WINDOW_SCRIPT: &str = include_str!("slide_window.lua");

pub struct RedisStore {
    conn: ConnectionManager,
    slide_window: Script,
}

impl RedisStore {
    /// Connect to Redis. The connection manager reconnects on its own after
    /// transient failures.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            slide_window: Script::new(SLIDE_WINDOW_SCRIPT),
        })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // PX 0 is rejected by Redis
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = conn.pset_ex(key, value, millis).await?;
        Ok(())
    }

    async fn slide_window(
        &self,
        key: &str,
        interval_ms: u64,
        rate: u64,
        now_ms: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // Sorted-set members must be unique or same-millisecond calls collapse
        let member = format!("{}-{}", now_ms, uuid::Uuid::new_v4().simple());

        let mut invocation = self.slide_window.prepare_invoke();
        invocation
            .key(key)
            .arg(interval_ms)
            .arg(rate)
            .arg(now_ms)
            .arg(member);

        let limited: bool = invocation.invoke_async(&mut conn).await?;
        Ok(limited)
    }
}
