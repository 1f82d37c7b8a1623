//! Best-effort, time-bounded cache of repository descriptions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      MetadataCache                            │
//! │   - key: "{prefix}{owner/name}"                               │
//! │   - value: {"t": <epoch ms>, "description": "..."}            │
//! │   - lookup → Hit(description) | Miss                          │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     KeyValueStore                             │
//! │   - MemoryStore: in-memory (testing, no persistent storage)   │
//! │   - browser localStorage (folio-web)                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StoreError::Unavailable` | storage disabled / blocked | `Err`, caller treats as miss |
//! | `StoreError::Rejected` | quota exceeded | `Err`, caller ignores the write |
//! | `CacheError::Corrupt` | unparsable entry | `Err`, caller treats as miss |
//! | stale or empty entry | TTL elapsed | `Ok(Miss)` |
//!
//! Entries are never deleted; a fresh fetch simply overwrites them.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::metadata::RepoId;

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The storage area cannot be used at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The store refused a write (for example, quota exceeded).
    #[error("storage write rejected: {0}")]
    Rejected(String),
}

/// Errors raised by [`MetadataCache`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stored entry is not valid JSON of the expected shape.
    #[error("corrupt cache entry `{key}`: {message}")]
    Corrupt { key: String, message: String },
}

/// String key/value storage, shaped after the browser's `localStorage`.
pub trait KeyValueStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// In-memory store for tests and hosts without persistent storage.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().map(|g| g.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self
            .data
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .finish()
    }
}

/// Stored form of one cached description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the description was fetched, in epoch milliseconds.
    pub t: i64,
    pub description: String,
}

impl CacheEntry {
    /// Whether the entry is usable at `now_ms` under `ttl_ms`.
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: u64) -> bool {
        let ttl = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
        !self.description.is_empty() && now_ms.saturating_sub(self.t) < ttl
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
}

/// Repository description cache over any [`KeyValueStore`].
#[derive(Debug)]
pub struct MetadataCache<S> {
    store: S,
    prefix: String,
    ttl_ms: u64,
}

impl<S: KeyValueStore> MetadataCache<S> {
    #[must_use]
    pub fn new(store: S, prefix: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl_ms,
        }
    }

    /// Storage key for `repo`.
    #[must_use]
    pub fn key(&self, repo: &RepoId) -> String {
        format!("{}{}", self.prefix, repo)
    }

    /// Look up a fresh description for `repo`.
    pub fn lookup(&self, repo: &RepoId, now_ms: i64) -> Result<CacheLookup, CacheError> {
        let key = self.key(repo);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(CacheLookup::Miss);
        };
        let entry: CacheEntry = serde_json::from_str(&raw).map_err(|e| CacheError::Corrupt {
            key: key.clone(),
            message: e.to_string(),
        })?;
        if entry.is_fresh(now_ms, self.ttl_ms) {
            debug!(key = %key, age_ms = now_ms.saturating_sub(entry.t), "metadata cache hit");
            Ok(CacheLookup::Hit(entry.description))
        } else {
            debug!(key = %key, "metadata cache entry stale");
            Ok(CacheLookup::Miss)
        }
    }

    /// Record `description` for `repo`, fetched at `now_ms`.
    pub fn store(&self, repo: &RepoId, description: &str, now_ms: i64) -> Result<(), CacheError> {
        let key = self.key(repo);
        let entry = CacheEntry {
            t: now_ms,
            description: description.to_owned(),
        };
        // Serializing a struct of an integer and a string cannot fail.
        let json = serde_json::to_string(&entry).unwrap_or_default();
        self.store.set(&key, &json)?;
        Ok(())
    }

    /// The underlying store.
    #[must_use]
    pub fn backend(&self) -> &S {
        &self.store
    }
}
