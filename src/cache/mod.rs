//! Time-bounded result cache
//!
//! Records are kept for a fixed validity window and checked lazily on read.
//! When an insert pushes the cache past its capacity, only the most recently
//! inserted entries survive. Reads do not refresh an entry's position.

use crate::config::CacheConfig;
use crate::record::ResultRecord;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A cached record and the moment it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub record: ResultRecord,
    pub created_at: DateTime<Utc>,
    /// Insertion order, breaks ties between equal timestamps
    sequence: u64,
}

impl CacheEntry {
    /// Whether the entry is past its validity window at `now`
    ///
    /// An entry exactly `ttl` old is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Snapshot of the cache contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    /// Keys currently held, sorted
    pub entries: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

/// Result cache shared between concurrent retrievals
#[derive(Debug)]
pub struct ResultCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    max_entries: usize,
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            max_entries,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let hours = i64::try_from(config.ttl_hours).unwrap_or(i64::MAX / 3_600);
        Self::new(Duration::hours(hours), config.max_entries)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the live record for `key`, if any
    pub fn get(&self, key: &str) -> Option<ResultRecord> {
        self.get_at(key, Utc::now())
    }

    /// Like [`get`](Self::get), evaluated at an explicit instant
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<ResultRecord> {
        let mut state = self.lock();
        let entry = state.entries.get(key)?;

        if entry.is_expired_at(now, self.ttl) {
            tracing::debug!("Cache entry expired: {}", key);
            state.entries.remove(key);
            return None;
        }

        Some(entry.record.clone())
    }

    /// Stores `record` under `key`
    pub fn put(&self, key: &str, record: ResultRecord) {
        self.put_at(key, record, Utc::now());
    }

    /// Like [`put`](Self::put), with an explicit creation time
    pub fn put_at(&self, key: &str, record: ResultRecord, created_at: DateTime<Utc>) {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        state.entries.insert(
            key.to_string(),
            CacheEntry {
                record,
                created_at,
                sequence,
            },
        );

        if state.entries.len() > self.max_entries {
            self.prune(&mut state);
        }
    }

    /// Keeps the `max_entries` most recently inserted entries
    fn prune(&self, state: &mut CacheState) {
        let mut order: Vec<(DateTime<Utc>, u64, String)> = state
            .entries
            .iter()
            .map(|(key, entry)| (entry.created_at, entry.sequence, key.clone()))
            .collect();
        order.sort_unstable_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

        let evicted = order.len() - self.max_entries;
        for (_, _, key) in order.into_iter().skip(self.max_entries) {
            state.entries.remove(&key);
        }
        tracing::debug!("Pruned {} cache entries", evicted);
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut entries: Vec<String> = state.entries.keys().cloned().collect();
        entries.sort();
        CacheStats {
            size: entries.len(),
            entries,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
