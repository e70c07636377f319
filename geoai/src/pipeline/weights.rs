//! Content-addressed cache for model weights.
//!
//! Entries are keyed by the SHA-256 of the weights URL and persisted as
//! `{key}.bin` next to a `{key}.json` metadata record. A memory layer in
//! front of the disk collapses concurrent requests for the same URL into
//! one download. Entries never expire; only [`WeightCache::clear`] removes
//! them.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::provider::{redact_query, AsyncHttpClient, ProviderError};

/// Default size of the in-memory layer (512 MiB).
pub const DEFAULT_WEIGHTS_MEMORY_BYTES: u64 = 512 * 1024 * 1024;

const DATA_EXTENSION: &str = "bin";
const METADATA_EXTENSION: &str = "json";

/// Errors raised by the weight cache.
///
/// Persistence failures are not errors: a read failure is a miss and a
/// write failure is logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightCacheError {
    /// The weights could not be downloaded.
    #[error("failed to download weights from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: ProviderError,
    },

    /// Clearing the cache directory failed.
    #[error("failed to clear weight cache at {path}: {message}")]
    Clear { path: PathBuf, message: String },
}

/// Metadata stored beside each cached weights file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntryMetadata {
    pub url: String,
    pub size_bytes: u64,
    pub cached_at: DateTime<Utc>,
}

/// Persistent, content-addressed store of downloaded weights.
pub struct WeightCache<C> {
    directory: PathBuf,
    client: C,
    memory: Cache<String, Arc<Vec<u8>>>,
    downloads: AtomicU64,
}

impl<C: AsyncHttpClient> WeightCache<C> {
    /// Creates a cache rooted at `directory`.
    ///
    /// The directory is created on first write.
    ///
    /// # Arguments
    ///
    /// * `directory` - Where `.bin` and `.json` entries are stored
    /// * `memory_size_bytes` - Capacity of the in-memory layer
    /// * `client` - HTTP client used on a miss
    pub fn new(directory: impl Into<PathBuf>, memory_size_bytes: u64, client: C) -> Self {
        let memory = Cache::builder()
            .weigher(|_key: &String, value: &Arc<Vec<u8>>| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(memory_size_bytes)
            .build();

        Self {
            directory: directory.into(),
            client,
            memory,
            downloads: AtomicU64::new(0),
        }
    }

    /// Stable cache key for a weights URL: lowercase hex SHA-256.
    pub fn cache_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of network downloads performed by this instance.
    pub fn downloads(&self) -> u64 {
        self.downloads.load(Ordering::Relaxed)
    }

    /// Returns the weights for `url`, downloading them on a miss.
    ///
    /// Concurrent calls for the same URL share one download.
    pub async fn get_weights(&self, url: &str) -> Result<Arc<Vec<u8>>, WeightCacheError> {
        let key = Self::cache_key(url);
        self.memory
            .try_get_with(key.clone(), self.load(url, &key))
            .await
            .map_err(|e| (*e).clone())
    }

    /// Whether a valid entry for `url` exists on disk.
    pub async fn contains(&self, url: &str) -> bool {
        self.read_entry(&Self::cache_key(url)).await.is_some()
    }

    /// Removes every entry from memory and disk.
    pub async fn clear(&self) -> Result<(), WeightCacheError> {
        self.memory.invalidate_all();
        self.memory.run_pending_tasks().await;

        let clear_err = |e: io::Error| WeightCacheError::Clear {
            path: self.directory.clone(),
            message: e.to_string(),
        };

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(clear_err(e)),
        };

        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await.map_err(clear_err)? {
            let path = entry.path();
            let owned = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == DATA_EXTENSION || ext == METADATA_EXTENSION);
            if owned {
                tokio::fs::remove_file(&path).await.map_err(clear_err)?;
                removed += 1;
            }
        }

        info!(directory = %self.directory.display(), files = removed, "Weight cache cleared");
        Ok(())
    }

    async fn load(&self, url: &str, key: &str) -> Result<Arc<Vec<u8>>, WeightCacheError> {
        if let Some(bytes) = self.read_entry(key).await {
            debug!(key = key, bytes = bytes.len(), "Weight cache hit");
            return Ok(Arc::new(bytes));
        }

        debug!(key = key, url = redact_query(url), "Weight cache miss, downloading");
        let bytes = self
            .client
            .get(url)
            .await
            .map_err(|source| WeightCacheError::Download {
                url: redact_query(url).to_string(),
                source,
            })?;
        self.downloads.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.write_entry(url, key, &bytes).await {
            warn!(
                key = key,
                directory = %self.directory.display(),
                error = %e,
                "Failed to persist model weights, continuing without cache"
            );
        }

        Ok(Arc::new(bytes))
    }

    fn entry_path(&self, key: &str, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", key, extension))
    }

    /// Reads an entry, treating anything unreadable or inconsistent as a miss.
    async fn read_entry(&self, key: &str) -> Option<Vec<u8>> {
        let metadata_path = self.entry_path(key, METADATA_EXTENSION);
        let metadata: WeightEntryMetadata = match tokio::fs::read(&metadata_path).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(key = key, error = %e, "Corrupt weight metadata, treating as miss");
                    return None;
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = key, error = %e, "Unreadable weight metadata, treating as miss");
                return None;
            }
        };

        match tokio::fs::read(self.entry_path(key, DATA_EXTENSION)).await {
            Ok(bytes) if bytes.len() as u64 == metadata.size_bytes => Some(bytes),
            Ok(bytes) => {
                warn!(
                    key = key,
                    expected = metadata.size_bytes,
                    actual = bytes.len(),
                    "Truncated weight file, treating as miss"
                );
                None
            }
            Err(e) => {
                warn!(key = key, error = %e, "Unreadable weight file, treating as miss");
                None
            }
        }
    }

    /// Writes data through a temporary file, then the metadata record.
    async fn write_entry(&self, url: &str, key: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let data_path = self.entry_path(key, DATA_EXTENSION);
        let temp_path = self.entry_path(key, "partial");
        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, &data_path).await?;

        let metadata = WeightEntryMetadata {
            url: redact_query(url).to_string(),
            size_bytes: bytes.len() as u64,
            cached_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&metadata).map_err(io::Error::other)?;
        tokio::fs::write(self.entry_path(key, METADATA_EXTENSION), json).await?;

        debug!(key = key, bytes = bytes.len(), "Model weights persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;
    use tempfile::TempDir;

    const URL: &str = "https://models.test/detector/model.onnx";

    fn weights_client() -> MockAsyncHttpClient {
        MockAsyncHttpClient::new(|url| Ok(url.as_bytes().to_vec()))
    }

    #[test]
    fn test_cache_key_is_stable_hex() {
        let a = WeightCache::<MockAsyncHttpClient>::cache_key(URL);
        let b = WeightCache::<MockAsyncHttpClient>::cache_key(URL);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, WeightCache::<MockAsyncHttpClient>::cache_key("https://models.test/other"));
    }

    #[tokio::test]
    async fn test_miss_downloads_and_persists() {
        let dir = TempDir::new().unwrap();
        let client = weights_client();
        let cache = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, client.clone());

        let bytes = cache.get_weights(URL).await.unwrap();
        assert_eq!(bytes.as_slice(), URL.as_bytes());
        assert_eq!(client.call_count(), 1);
        assert!(cache.contains(URL).await);

        let key = WeightCache::<MockAsyncHttpClient>::cache_key(URL);
        assert!(dir.path().join(format!("{}.bin", key)).exists());
        assert!(dir.path().join(format!("{}.json", key)).exists());
    }

    #[tokio::test]
    async fn test_hit_from_disk_needs_no_network() {
        let dir = TempDir::new().unwrap();
        let first = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, weights_client());
        first.get_weights(URL).await.unwrap();

        let offline = MockAsyncHttpClient::failing("offline");
        let second = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, offline.clone());
        let bytes = second.get_weights(URL).await.unwrap();
        assert_eq!(bytes.as_slice(), URL.as_bytes());
        assert_eq!(offline.call_count(), 0);
        assert_eq!(second.downloads(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_download_once() {
        let dir = TempDir::new().unwrap();
        let client = weights_client();
        let cache = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, client.clone());

        let results = futures::future::join_all((0..8).map(|_| cache.get_weights(URL))).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_truncated_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let first = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, weights_client());
        first.get_weights(URL).await.unwrap();

        let key = WeightCache::<MockAsyncHttpClient>::cache_key(URL);
        std::fs::write(dir.path().join(format!("{}.bin", key)), b"short").unwrap();

        let client = weights_client();
        let second = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, client.clone());
        let bytes = second.get_weights(URL).await.unwrap();
        assert_eq!(bytes.as_slice(), URL.as_bytes());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_directory_still_returns_weights() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let cache = WeightCache::new(blocker.join("models"), DEFAULT_WEIGHTS_MEMORY_BYTES, weights_client());
        let bytes = cache.get_weights(URL).await.unwrap();
        assert_eq!(bytes.as_slice(), URL.as_bytes());
        assert!(!cache.contains(URL).await);
    }

    #[tokio::test]
    async fn test_download_failure() {
        let dir = TempDir::new().unwrap();
        let cache = WeightCache::new(
            dir.path(),
            DEFAULT_WEIGHTS_MEMORY_BYTES,
            MockAsyncHttpClient::failing("404"),
        );
        assert!(matches!(
            cache.get_weights(URL).await,
            Err(WeightCacheError::Download { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_forces_download() {
        let dir = TempDir::new().unwrap();
        let client = weights_client();
        let cache = WeightCache::new(dir.path(), DEFAULT_WEIGHTS_MEMORY_BYTES, client.clone());

        cache.get_weights(URL).await.unwrap();
        cache.clear().await.unwrap();
        assert!(!cache.contains(URL).await);

        cache.get_weights(URL).await.unwrap();
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_missing_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        let cache = WeightCache::new(
            dir.path().join("never-created"),
            DEFAULT_WEIGHTS_MEMORY_BYTES,
            weights_client(),
        );
        assert!(cache.clear().await.is_ok());
    }
}
