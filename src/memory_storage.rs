use crate::store::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// In-process session storage.
///
/// Because there is no external persistence, this backend is ephemeral and
/// will be cleared on server restart.
///
/// # ***READ THIS BEFORE USING IN A PRODUCTION DEPLOYMENT***
///
/// Storing sessions only in memory brings the following problems:
///
/// 1. All sessions must fit in available memory (important for high load services)
/// 2. Expired entries are dropped lazily when read; entries that are never
///    read again stay resident until [`MemoryStorage::cleanup`] runs.
///    If sessions are not cleaned up properly it might result in OOM
/// 3. All sessions will be lost on shutdown
/// 4. If the service is clustered a particular session will be stored only
///    on a single instance. This might be solved by load balancers with
///    sticky sessions, at the cost of additional complexity
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }
}

impl MemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of stored entries. Expired entries count until
    /// they are dropped by a read or a [`MemoryStorage::cleanup`] sweep.
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Returns true if the storage holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep expired entries. This should be run on an intermittent basis
    /// if this storage is run for long enough that memory accumulation is a
    /// concern.
    pub fn cleanup(&self) -> anyhow::Result<()> {
        let mut entries = self.lock()?;
        let now = Utc::now();
        let initial_len = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        log::trace!(
            "swept {} expired session records",
            initial_len - entries.len()
        );
        Ok(())
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage mutex poisoned"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut entries = self.lock()?;
        let expired = entries
            .get(key)
            .map_or(false, |entry| entry.is_expired(Utc::now()));
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.payload.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Utc::now() + chrono::Duration::from_std(ttl)?)
        };
        self.lock()?.insert(
            key.to_string(),
            Entry {
                payload: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}
