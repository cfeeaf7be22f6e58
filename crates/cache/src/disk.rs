//! Persistent on-disk blob cache.
//!
//! Each blob lives in its own file named after the BLAKE3 hash of its key,
//! so arbitrary document paths map to safe, fixed-length filenames. The file
//! starts with a small header carrying the original key, which lets the
//! cache enumerate its keys after a restart without a separate index.
//!
//! File layout:
//!
//! ```text
//! magic "EMB1" | key length (u32 LE) | key bytes (UTF-8) | blob bytes
//! ```
//!
//! Writes go to a temporary file that is renamed into place, so a crash
//! mid-write never leaves a truncated blob under a valid name.

use crate::store::{degrade, BlobStore, CacheError, CacheStats};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;

const MAGIC: &[u8; 4] = b"EMB1";
const BLOB_EXTENSION: &str = "blob";
const TMP_EXTENSION: &str = "tmp";

/// Distinguishes temp files of overlapping writes to the same key.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lookup counters shared by all clones of a cache handle
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Disk-backed [`BlobStore`].
///
/// Cheap to clone; clones share the directory and counters.
#[derive(Debug, Clone)]
pub struct DiskBlobCache {
    cache_dir: PathBuf,
    counters: Arc<Counters>,
}

impl DiskBlobCache {
    /// Opens (and creates if needed) a cache rooted at `cache_dir`.
    pub async fn open<P: AsRef<Path>>(cache_dir: P) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).await.map_err(CacheError::Unavailable)?;

        tracing::debug!(dir = %cache_dir.display(), "disk blob cache opened");
        Ok(Self { cache_dir, counters: Arc::default() })
    }

    /// Cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Generate file path for a cache key
    fn key_to_path(&self, key: &str) -> PathBuf {
        let hash = blake3::hash(key.as_bytes());
        self.cache_dir.join(format!("{}.{BLOB_EXTENSION}", hash.to_hex()))
    }

    fn encode(key: &str, blob: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(MAGIC.len() + 4 + key.len() + blob.len());
        buf.put_slice(MAGIC);
        buf.put_u32_le(key.len() as u32);
        buf.put_slice(key.as_bytes());
        buf.put_slice(blob);
        buf.freeze()
    }

    /// Splits a stored file into its key and blob.
    fn decode(mut file: Bytes) -> io::Result<(String, Bytes)> {
        let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_owned());

        if file.len() < MAGIC.len() + 4 || &file[..MAGIC.len()] != MAGIC {
            return Err(invalid("missing blob header"));
        }

        let len_bytes: [u8; 4] = file[MAGIC.len()..MAGIC.len() + 4]
            .try_into()
            .map_err(|_| invalid("truncated key length"))?;
        let key_len = u32::from_le_bytes(len_bytes) as usize;
        let header_len = MAGIC.len() + 4 + key_len;

        if file.len() < header_len {
            return Err(invalid("truncated key"));
        }

        let key = String::from_utf8(file[MAGIC.len() + 4..header_len].to_vec())
            .map_err(|_| invalid("key is not UTF-8"))?;
        let blob = file.split_off(header_len);

        Ok((key, blob))
    }

    async fn read_entry(&self, key: &str) -> io::Result<Option<Bytes>> {
        let bytes = match fs::read(self.key_to_path(key)).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        let (stored_key, blob) = Self::decode(bytes)?;
        if stored_key != key {
            return Ok(None);
        }

        Ok(Some(blob))
    }

    /// Stored blob files with their decoded keys and blob sizes.
    async fn scan(&self) -> io::Result<Vec<(String, u64)>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }

            match fs::read(&path).await.and_then(|bytes| Self::decode(Bytes::from(bytes))) {
                Ok((key, blob)) => entries.push((key, blob.len() as u64)),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable cache file"
                    );
                }
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[async_trait]
impl BlobStore for DiskBlobCache {
    async fn exists(&self, key: &str) -> bool {
        degrade("exists", key, fs::try_exists(self.key_to_path(key)).await)
    }

    async fn save(&self, key: &str, blob: Bytes) -> Result<(), CacheError> {
        let path = self.key_to_path(key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}-{seq}.{TMP_EXTENSION}", std::process::id()));

        fs::create_dir_all(&self.cache_dir).await.map_err(|err| CacheError::io(key, err))?;
        fs::write(&tmp, Self::encode(key, &blob)).await.map_err(|err| CacheError::io(key, err))?;
        fs::rename(&tmp, &path).await.map_err(|err| CacheError::io(key, err))?;

        tracing::debug!(key, bytes = blob.len(), "blob cached");
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        let blob = degrade("get", key, self.read_entry(key).await);

        let counter = if blob.is_some() { &self.counters.hits } else { &self.counters.misses };
        counter.fetch_add(1, Ordering::Relaxed);

        blob
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.key_to_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheError::io(key, err)),
        }
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(CacheError::Unavailable(err)),
        };

        let mut removed = 0usize;
        while let Some(entry) = dir.next_entry().await.map_err(CacheError::Unavailable)? {
            let path = entry.path();
            let ext = path.extension().and_then(|ext| ext.to_str());
            if !matches!(ext, Some(BLOB_EXTENSION) | Some(TMP_EXTENSION)) {
                continue;
            }

            fs::remove_file(&path)
                .await
                .map_err(|err| CacheError::io(path.display().to_string(), err))?;
            removed += 1;
        }

        tracing::info!(removed, "disk blob cache cleared");
        Ok(())
    }

    async fn list_keys(&self) -> Vec<String> {
        let entries = degrade("list_keys", "*", self.scan().await);
        entries.into_iter().map(|(key, _)| key).collect()
    }

    async fn stats(&self) -> CacheStats {
        let entries = degrade("stats", "*", self.scan().await);

        CacheStats {
            count: entries.len(),
            total_size_bytes: entries.iter().map(|(_, size)| size).sum(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_cache() -> (DiskBlobCache, tempfile::TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let cache = DiskBlobCache::open(temp.path().join("blobs")).await.unwrap();
        (cache, temp)
    }

    #[tokio::test]
    async fn test_save_then_get_is_byte_identical() {
        let (cache, _temp) = create_test_cache().await;

        let blob = Bytes::from((0..=255u8).cycle().take(70_000).collect::<Vec<_>>());
        cache.save("books/unit 1/lesson.pdf", blob.clone()).await.unwrap();

        let retrieved = cache.get("books/unit 1/lesson.pdf").await.unwrap();
        assert_eq!(retrieved, blob);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_of_same_key() {
        let (cache, _temp) = create_test_cache().await;
        let blob = Bytes::from(vec![7u8; 4 * 1024 * 1024]);

        for _ in 0..20 {
            let first = tokio::spawn({
                let (cache, blob) = (cache.clone(), blob.clone());
                async move { cache.save("a.pdf", blob).await }
            });
            let second = tokio::spawn({
                let (cache, blob) = (cache.clone(), blob.clone());
                async move { cache.save("a.pdf", blob).await }
            });

            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();
        }

        assert_eq!(cache.get("a.pdf").await.unwrap(), blob);
        assert_eq!(cache.list_keys().await, vec!["a.pdf".to_string()]);

        let leftovers = std::fs::read_dir(cache.cache_dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _temp) = create_test_cache().await;

        assert!(cache.get("missing.pdf").await.is_none());
        assert!(!cache.exists("missing.pdf").await);

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_overwrite_existing_key() {
        let (cache, _temp) = create_test_cache().await;

        cache.save("a.pdf", Bytes::from_static(b"first")).await.unwrap();
        cache.save("a.pdf", Bytes::from_static(b"second version")).await.unwrap();

        assert_eq!(cache.get("a.pdf").await.unwrap(), Bytes::from_static(b"second version"));
        assert_eq!(cache.stats().await.count, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let (cache, _temp) = create_test_cache().await;

        cache.save("a.pdf", Bytes::from_static(b"data")).await.unwrap();
        assert!(cache.exists("a.pdf").await);

        cache.remove("a.pdf").await.unwrap();
        assert!(!cache.exists("a.pdf").await);

        // Removing again is not an error
        cache.remove("a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear() {
        let (cache, _temp) = create_test_cache().await;

        for key in ["a.pdf", "b.pdf", "dir/c.pdf"] {
            cache.save(key, Bytes::from_static(b"data")).await.unwrap();
        }
        assert_eq!(cache.stats().await.count, 3);

        cache.clear().await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_stats_sum_blob_sizes() {
        let (cache, _temp) = create_test_cache().await;

        cache.save("a.pdf", Bytes::from(vec![1u8; 1024])).await.unwrap();
        cache.save("b.pdf", Bytes::from(vec![2u8; 512])).await.unwrap();
        cache.get("a.pdf").await;

        let stats = cache.stats().await;
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_size_bytes, 1536);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_list_keys_survives_reopen() {
        let (cache, temp) = create_test_cache().await;

        cache.save("z.pdf", Bytes::from_static(b"z")).await.unwrap();
        cache.save("a/b.pdf", Bytes::from_static(b"b")).await.unwrap();

        let reopened = DiskBlobCache::open(temp.path().join("blobs")).await.unwrap();
        assert_eq!(reopened.list_keys().await, vec!["a/b.pdf".to_owned(), "z.pdf".to_owned()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_miss() {
        let (cache, _temp) = create_test_cache().await;

        cache.save("a.pdf", Bytes::from_static(b"data")).await.unwrap();
        std::fs::write(cache.key_to_path("a.pdf"), b"garbage").unwrap();

        assert!(cache.get("a.pdf").await.is_none());
        assert!(cache.list_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_fails_when_directory_is_a_file() {
        let temp = tempfile::tempdir().unwrap();
        let cache = DiskBlobCache::open(temp.path().join("blobs")).await.unwrap();

        std::fs::remove_dir_all(cache.cache_dir()).unwrap();
        std::fs::write(cache.cache_dir(), b"not a directory").unwrap();

        let result = cache.save("a.pdf", Bytes::from_static(b"data")).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(DiskBlobCache::decode(Bytes::from_static(b"EM")).is_err());
        assert!(DiskBlobCache::decode(Bytes::from_static(b"EMB1\xff\x00\x00\x00ab")).is_err());
    }
}
