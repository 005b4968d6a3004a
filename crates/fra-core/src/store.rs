//! Key-value record storage with optional expiry.
//!
//! Stores never evict on their own: readers compare `expires_at` against their
//! own clock, so an expired record and a missing one look the same to callers.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub value: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheRecord {
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheRecord>;

    /// Write `value` under `key`, replacing any previous record.
    ///
    /// # Errors
    /// Returns an error when the record cannot be persisted.
    fn set(
        &self,
        key: &str,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    /// Returns an error when the backing storage refuses the removal.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-wide in-memory store. Concurrent writers race; the last one wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CacheRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CacheRecord> {
        self.records().get(key).cloned()
    }

    fn set(
        &self,
        key: &str,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.records()
            .insert(key.to_string(), CacheRecord { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CacheStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<CacheRecord> {
        let path = self.record_path(key).ok()?;
        let data = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn set(
        &self,
        key: &str,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let path = self.record_path(key)?;
        let data = serde_json::to_vec(&CacheRecord { value, expires_at })
            .map_err(StoreError::Encode)?;

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::io("failed to create store directory", e))?;

        // Readers see either the old record or the new one, never a torn file.
        let mut staged = NamedTempFile::new_in(&self.dir)
            .map_err(|e| StoreError::io("failed to stage record", e))?;
        staged
            .write_all(&data)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| StoreError::io("failed to write record", e))?;
        staged
            .persist(&path)
            .map_err(|e| StoreError::io("failed to replace record", e.error))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(StoreError::io("failed to remove record", error)),
        }
    }
}
