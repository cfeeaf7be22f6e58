//! Earmark document cache
//!
//! Client-local key to blob cache keyed by document path, with on-disk and
//! in-memory backends behind the [`BlobStore`] trait.

pub mod config;
pub mod disk;
pub mod memory;
pub mod store;

pub use config::{CacheConfig, ConfigError};
pub use disk::DiskBlobCache;
pub use memory::MemoryBlobCache;
pub use store::{BlobStore, CacheError, CacheStats};

use std::sync::Arc;

/// Shared handle to whichever backend is active
pub type SharedBlobStore = Arc<dyn BlobStore>;

/// Opens the cache described by `config`.
///
/// Returns `None` when caching is disabled. If the disk directory cannot be
/// created the cache falls back to memory, since a missing cache must never
/// keep a document from opening.
pub async fn open_cache(config: &CacheConfig) -> Option<SharedBlobStore> {
    if !config.enabled {
        tracing::info!("document cache disabled");
        return None;
    }

    match DiskBlobCache::open(&config.dir).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(err) => {
            tracing::warn!(
                dir = %config.dir.display(),
                error = %err,
                "disk cache unavailable, using in-memory cache"
            );
            Some(Arc::new(MemoryBlobCache::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_disabled_config_yields_no_cache() {
        let config = CacheConfig::default().with_enabled(false);
        assert!(open_cache(&config).await.is_none());
    }

    #[tokio::test]
    async fn test_unusable_dir_falls_back_to_memory() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let config = CacheConfig::default().with_dir(blocker.join("nested"));
        let cache = open_cache(&config).await.unwrap();

        cache.save("a.pdf", Bytes::from_static(b"data")).await.unwrap();
        assert!(cache.exists("a.pdf").await);
        assert!(!blocker.join("nested").exists());
    }

    #[tokio::test]
    async fn test_enabled_config_uses_disk() {
        let temp = tempfile::tempdir().unwrap();
        let config = CacheConfig::default().with_dir(temp.path().join("blobs"));

        let cache = open_cache(&config).await.unwrap();
        cache.save("a.pdf", Bytes::from_static(b"data")).await.unwrap();

        assert!(temp.path().join("blobs").read_dir().unwrap().next().is_some());
    }
}
