//! # File Cache
//!
//! Persistent cache tier backed by the local filesystem. Entries survive
//! process restarts; each entry is a payload file plus a JSON `.meta`
//! sidecar, published atomically via a temp-file rename so concurrent
//! readers never observe a torn entry.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::types::{
    CacheKey, CacheLookupResult, CacheMetadata, CacheResourceType, CacheResult,
};

use super::CacheProvider;

const RESOURCE_DIRS: [CacheResourceType; 2] =
    [CacheResourceType::Playlist, CacheResourceType::Segment];

#[derive(Debug, Clone)]
pub struct FileCache {
    cache_dir: PathBuf,
    /// Maximum total payload size in bytes; 0 disables the bound
    max_size: u64,
    initialized: std::sync::Arc<std::sync::atomic::AtomicBool>,
    enabled: bool,
}

impl FileCache {
    /// Create a new file cache rooted at the specified directory
    pub fn new(cache_dir: PathBuf, max_size: u64, enabled: bool) -> Self {
        Self {
            cache_dir,
            max_size,
            initialized: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
            enabled,
        }
    }

    /// Initialize the cache directories
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        use std::sync::atomic::Ordering;

        // Fast path - already initialized
        if self.initialized.load(Ordering::Relaxed) {
            return Ok(());
        }

        if !self.enabled {
            return Ok(());
        }

        // Use compare_exchange to ensure only one task initializes
        if self
            .initialized
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            fs::create_dir_all(&self.cache_dir).await?;
            for res_type in &RESOURCE_DIRS {
                fs::create_dir_all(self.cache_dir.join(format!("{res_type:?}"))).await?;
            }
            self.initialized.store(true, Ordering::Release);
        } else {
            // Another task is initializing, wait for it to complete
            while !self.initialized.load(Ordering::Acquire) {
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }

    /// Get the path for a cached resource
    fn get_cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{:?}", key.resource_type))
            .join(key.to_filename())
    }

    /// Get the metadata path for a cached resource
    fn get_metadata_path(&self, key: &CacheKey) -> PathBuf {
        let mut path = self.get_cache_path(key);
        path.set_extension("meta");
        path
    }

    /// List every persisted entry as (data path, meta path, cached_at, size).
    ///
    /// Entries whose metadata cannot be read are deleted on the spot.
    async fn list_entries(&self) -> io::Result<Vec<(PathBuf, PathBuf, u64, u64)>> {
        let mut entries = Vec::new();
        for res_type in &RESOURCE_DIRS {
            let dir = self.cache_dir.join(format!("{res_type:?}"));
            let mut read_dir = match fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let data_path = entry.path();
                let is_payload = data_path
                    .extension()
                    .is_none_or(|ext| ext != "meta" && ext != "tmp");
                if !is_payload || !data_path.is_file() {
                    continue;
                }
                let meta_path = data_path.with_extension("meta");
                let metadata: CacheMetadata = match fs::read(&meta_path).await {
                    Ok(bytes) => match serde_json::from_slice(&bytes) {
                        Ok(m) => m,
                        Err(e) => {
                            warn!(path = ?meta_path, error = %e, "Dropping entry with unreadable metadata");
                            let _ = fs::remove_file(&data_path).await;
                            let _ = fs::remove_file(&meta_path).await;
                            continue;
                        }
                    },
                    Err(e) => {
                        warn!(path = ?meta_path, error = %e, "Dropping entry with missing metadata");
                        let _ = fs::remove_file(&data_path).await;
                        continue;
                    }
                };
                entries.push((data_path, meta_path, metadata.cached_at, metadata.size));
            }
        }
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl CacheProvider for FileCache {
    async fn contains(&self, key: &CacheKey) -> CacheResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        self.ensure_initialized().await?;

        let data_exists = fs::try_exists(&self.get_cache_path(key)).await?;
        let meta_exists = fs::try_exists(&self.get_metadata_path(key)).await?;

        Ok(data_exists && meta_exists)
    }

    async fn get(&self, key: &CacheKey) -> CacheLookupResult {
        if !self.enabled {
            return Ok(None);
        }

        self.ensure_initialized().await?;

        let data_path = self.get_cache_path(key);
        let meta_path = self.get_metadata_path(key);

        let data_exists = fs::try_exists(&data_path).await?;
        let meta_exists = fs::try_exists(&meta_path).await?;

        if !data_exists || !meta_exists {
            return Ok(None);
        }

        let metadata_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to read cache metadata file");
                return Ok(None);
            }
        };

        let metadata: CacheMetadata = match serde_json::from_slice(&metadata_bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to parse cache metadata");

                // Delete the invalid entry in the background
                let data_path_clone = data_path.clone();
                let meta_path_clone = meta_path.clone();
                tokio::spawn(async move {
                    let _ = fs::remove_file(&data_path_clone).await;
                    let _ = fs::remove_file(&meta_path_clone).await;
                });

                return Ok(None);
            }
        };

        let data = match fs::read(&data_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?data_path, error = %e, "Failed to read cache data file");
                return Ok(None);
            }
        };

        Ok(Some((Bytes::from(data), metadata)))
    }

    async fn put(&self, key: CacheKey, data: Bytes, metadata: CacheMetadata) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ensure_initialized().await?;

        let data_path = self.get_cache_path(&key);
        let meta_path = self.get_metadata_path(&key);

        if let Some(parent) = data_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let metadata_json = serde_json::to_vec(&metadata).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize metadata: {e}"),
            )
        })?;

        // Write to temporary files then rename, so readers only ever see a
        // fully written entry
        let temp_data_path = data_path.with_extension("tmp");
        let temp_meta_path = meta_path.with_extension("tmp");

        if let Err(e) = fs::write(&temp_data_path, &data).await {
            warn!(path = ?temp_data_path, error = %e, "Failed to write cache data file");
            return Err(e);
        }

        if let Err(e) = fs::write(&temp_meta_path, &metadata_json).await {
            warn!(path = ?temp_meta_path, error = %e, "Failed to write cache metadata file");
            let _ = fs::remove_file(&temp_data_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_data_path, &data_path).await {
            warn!(
                from = ?temp_data_path,
                to = ?data_path,
                error = %e,
                "Failed to rename temporary data file"
            );
            let _ = fs::remove_file(&temp_data_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_meta_path, &meta_path).await {
            warn!(
                from = ?temp_meta_path,
                to = ?meta_path,
                error = %e,
                "Failed to rename temporary metadata file"
            );
            // Data renamed but metadata did not; remove both to stay consistent
            let _ = fs::remove_file(&data_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        debug!(key = ?key, "Cached entry to file");
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ensure_initialized().await?;

        let data_path = self.get_cache_path(key);
        let meta_path = self.get_metadata_path(key);

        // Missing files are fine; anything else propagates
        let data_result = fs::remove_file(&data_path).await;
        let meta_result = fs::remove_file(&meta_path).await;

        match (data_result, meta_result) {
            (Err(e), _) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = ?data_path, error = %e, "Failed to remove cache data file");
                Err(e)
            }
            (_, Err(e)) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = ?meta_path, error = %e, "Failed to remove cache metadata file");
                Err(e)
            }
            _ => Ok(()),
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ensure_initialized().await?;

        let mut entries = fs::read_dir(&self.cache_dir).await?;
        let mut entry_count = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_dir() {
                fs::remove_dir_all(&path).await?;
            } else {
                fs::remove_file(&path).await?;
            }
            entry_count += 1;
        }

        debug!(count = entry_count, "Cleared cache entries");

        // Recreate the resource subdirectories
        self.initialized
            .store(false, std::sync::atomic::Ordering::Relaxed);
        self.ensure_initialized().await?;

        Ok(())
    }

    async fn sweep(&self) -> CacheResult<()> {
        if !self.enabled || self.max_size == 0 {
            return Ok(());
        }

        self.ensure_initialized().await?;

        let mut entries = self.list_entries().await?;
        let mut total: u64 = entries.iter().map(|(_, _, _, size)| *size).sum();
        if total <= self.max_size {
            return Ok(());
        }

        // Evict oldest-first until back under the size bound
        entries.sort_by_key(|(_, _, cached_at, _)| *cached_at);
        let mut evicted = 0;
        for (data_path, meta_path, _, size) in entries {
            if total <= self.max_size {
                break;
            }
            fs::remove_file(&data_path).await?;
            match fs::remove_file(&meta_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            total = total.saturating_sub(size);
            evicted += 1;
        }

        debug!(evicted, remaining_bytes = total, "Disk cache sweep complete");
        Ok(())
    }
}
