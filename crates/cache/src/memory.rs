//! In-memory blob cache.
//!
//! Used when no cache directory is usable and in tests. Contents are lost
//! when the last handle is dropped.

use crate::store::{BlobStore, CacheError, CacheStats};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, Bytes>,
    hits: u64,
    misses: u64,
}

/// Process-local [`BlobStore`]. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobCache {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBlobCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobCache {
    async fn exists(&self, key: &str) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    async fn save(&self, key: &str, blob: Bytes) -> Result<(), CacheError> {
        self.state.write().await.entries.insert(key.to_owned(), blob);
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.write().await;
        let blob = state.entries.get(key).cloned();

        if blob.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }

        blob
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.state.write().await.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.state.write().await.entries.clear();
        Ok(())
    }

    async fn list_keys(&self) -> Vec<String> {
        self.state.read().await.entries.keys().cloned().collect()
    }

    async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;

        CacheStats {
            count: state.entries.len(),
            total_size_bytes: state.entries.values().map(|blob| blob.len() as u64).sum(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}
