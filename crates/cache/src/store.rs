//! The blob store contract shared by every cache backend.
//!
//! Keys are document paths and values are opaque, immutable byte blobs.
//! Read operations never fail: an error while reading degrades to a miss
//! (logged at `warn`) so the caller simply falls back to the network.
//! Mutating operations return [`CacheError`] so the caller can report that
//! caching did not take effect.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::io;

/// Errors surfaced by mutating cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("cache directory unavailable: {0}")]
    Unavailable(#[source] io::Error),
}

impl CacheError {
    pub(crate) fn io(key: impl Into<String>, source: io::Error) -> Self {
        Self::Io { key: key.into(), source }
    }
}

/// Snapshot of cache contents and lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of stored blobs
    pub count: usize,
    /// Sum of all stored blob sizes in bytes
    pub total_size_bytes: u64,
    /// Lookups that returned a blob since this handle was created
    pub hits: u64,
    /// Lookups that found nothing since this handle was created
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a fraction (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key to blob store with no eviction policy.
///
/// Entries live until removed individually or cleared wholesale. Saving an
/// existing key overwrites it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob is stored under `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Stores `blob` under `key`, replacing any previous blob.
    async fn save(&self, key: &str, blob: Bytes) -> Result<(), CacheError>;

    /// Returns the stored blob, or `None` on a miss or read failure.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Removes the blob under `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every stored blob.
    async fn clear(&self) -> Result<(), CacheError>;

    /// All stored keys, sorted.
    async fn list_keys(&self) -> Vec<String>;

    /// Current contents summary.
    async fn stats(&self) -> CacheStats;
}

/// Logs a failed read and turns it into the fallback value.
pub(crate) fn degrade<T: Default>(operation: &str, key: &str, result: Result<T, io::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(operation, key, error = %err, "cache read failed, treating as miss");
            T::default()
        }
    }
}
