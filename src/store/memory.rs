//! In-process store for tests and single-instance deployments.
//!
//! All state sits behind one mutex, so the sliding-window update is atomic with
//! respect to every other caller in this process. It is NOT shared between
//! server instances; use Redis for that.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::{KvStore, StoreError};

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
struct Window {
    /// Admitted call timestamps (Unix milliseconds)
    admitted: Vec<u64>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    values: HashMap<String, Entry>,
    windows: HashMap<String, Window>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    /// Current value stored under `key`, if live.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.lock()?;
        let now = Instant::now();
        Ok(state
            .values
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }

    /// Number of admitted timestamps currently recorded for a window key.
    pub fn window_len(&self, key: &str) -> Result<usize, StoreError> {
        let state = self.lock()?;
        Ok(state.windows.get(key).map_or(0, |w| w.admitted.len()))
    }

    /// Remove expired values and idle windows. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        let now = Instant::now();

        let before = state.values.len() + state.windows.len();
        state.values.retain(|_, e| e.expires_at > now);
        state
            .windows
            .retain(|_, w| w.expires_at.is_some_and(|at| at > now));
        Ok(before - state.values.len() - state.windows.len())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let now = Instant::now();
        match state.values.get(key) {
            Some(entry) if entry.expires_at > now => Ok(true),
            Some(_) => {
                state.values.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn slide_window(
        &self,
        key: &str,
        interval_ms: u64,
        rate: u64,
        now_ms: u64,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let window = state.windows.entry(key.to_string()).or_default();

        if let Some(min) = now_ms.checked_sub(interval_ms) {
            window.admitted.retain(|&t| t > min);
        }

        if window.admitted.len() as u64 >= rate {
            return Ok(true);
        }

        window.admitted.push(now_ms);
        window.expires_at = Some(Instant::now() + Duration::from_millis(interval_ms));
        Ok(false)
    }
}
