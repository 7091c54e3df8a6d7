//! # Cache Manager
//!
//! Coordinates the memory and file cache tiers: lookups check memory first
//! and promote disk hits, writes go through to both tiers.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io;

use crate::cache::providers::file::FileCache;
use crate::cache::providers::memory::MemoryCache;
use crate::cache::providers::provider::CacheProvider;
use crate::cache::types::{CacheConfig, CacheKey, CacheLookupResult, CacheMetadata, CacheResult};

/// Cache manager handling both memory and file caching
#[derive(Clone)]
pub struct CacheManager {
    memory_cache: Arc<MemoryCache>,
    file_cache: Arc<FileCache>,
    config: Arc<CacheConfig>,
}

impl CacheManager {
    /// Create a new cache manager with the specified configuration
    pub async fn new(mut config: CacheConfig) -> io::Result<Self> {
        // If no disk cache path provided, use system temp
        if config.disk_cache_path.is_none() {
            let temp_dir = std::env::temp_dir();
            config.disk_cache_path = Some(temp_dir.join("hls-cache"));
        }

        let cache_dir = config.disk_cache_path.as_ref().unwrap().clone();
        let config = Arc::new(config);

        let memory_cache = Arc::new(MemoryCache::new(config.max_memory_cache_size));
        let file_cache = Arc::new(FileCache::new(
            cache_dir,
            config.max_disk_cache_size,
            config.enabled,
        ));

        // Initialize the cache directories in advance
        if config.enabled {
            file_cache.ensure_initialized().await?;
        }

        Ok(Self {
            memory_cache,
            file_cache,
            config,
        })
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> CacheLookupResult {
        if !self.config.enabled {
            return Ok(None);
        }

        // Check memory cache first
        if let Some((data, metadata)) = self.memory_cache.get(key).await? {
            return Ok(Some((data, metadata)));
        }

        // Try file cache if memory cache misses
        if let Some((data, metadata)) = self.file_cache.get(key).await? {
            // Store in memory cache for faster access next time
            let _ = self
                .memory_cache
                .put(key.clone(), data.clone(), metadata.clone())
                .await;

            return Ok(Some((data, metadata)));
        }

        Ok(None)
    }

    /// Put a value in the cache
    pub async fn put(
        &self,
        key: CacheKey,
        data: Bytes,
        metadata: CacheMetadata,
    ) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        // Memory tier is best-effort; the file tier is the source of truth
        let _ = self
            .memory_cache
            .put(key.clone(), data.clone(), metadata.clone())
            .await;

        self.file_cache.put(key, data, metadata).await
    }

    /// Remove a key from cache
    pub async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mem_result = self.memory_cache.remove(key).await;
        let file_result = self.file_cache.remove(key).await;

        // Return file cache error if any, otherwise memory cache error if any
        file_result.or(mem_result)
    }

    /// Clear all entries from both tiers.
    ///
    /// Failure to wipe the persistent tier propagates; it is never reported
    /// as success. In-flight fetches that complete during or after the clear
    /// may re-insert entries.
    pub async fn clear(&self) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mem_result = self.memory_cache.clear().await;
        let file_result = self.file_cache.clear().await;

        file_result.or(mem_result)
    }

    /// Check if a key exists in the cache
    pub async fn contains(&self, key: &CacheKey) -> CacheResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }

        if self.memory_cache.contains(key).await? {
            return Ok(true);
        }

        self.file_cache.contains(key).await
    }

    /// Get configuration reference
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Enforce the disk size bound and settle pending memory evictions
    pub async fn maintain(&self) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.memory_cache.sweep().await?;
        self.file_cache.sweep().await
    }

    /// Start a background maintenance task
    pub fn start_maintenance_task(
        self: Arc<Self>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.maintain().await {
                    tracing::warn!("Cache maintenance error: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::CacheResourceType;

    fn config_in(dir: &tempfile::TempDir) -> CacheConfig {
        CacheConfig {
            enabled: true,
            disk_cache_path: Some(dir.path().join("cache")),
            max_disk_cache_size: 1024 * 1024,
            max_memory_cache_size: 1024,
        }
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::new(
            CacheResourceType::Segment,
            format!("https://cdn.example/{name}"),
        )
    }

    #[tokio::test]
    async fn put_then_get_hits() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(config_in(&dir)).await.unwrap();
        let k = key("seg.ts");
        let d = Bytes::from_static(b"bytes");

        manager
            .put(k.clone(), d.clone(), CacheMetadata::new(d.len() as u64))
            .await
            .unwrap();

        let (res, _) = manager.get(&k).await.unwrap().expect("hit");
        assert_eq!(res, d);
    }

    #[tokio::test]
    async fn disk_hit_survives_memory_loss() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let k = key("seg.ts");
        let d = Bytes::from_static(b"persisted");

        {
            let manager = CacheManager::new(config.clone()).await.unwrap();
            manager
                .put(k.clone(), d.clone(), CacheMetadata::new(d.len() as u64))
                .await
                .unwrap();
        }

        // Fresh manager over the same directory: memory tier is cold
        let manager = CacheManager::new(config).await.unwrap();
        let (res, _) = manager.get(&k).await.unwrap().expect("disk hit");
        assert_eq!(res, d);
    }

    #[tokio::test]
    async fn clear_then_get_misses() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(config_in(&dir)).await.unwrap();
        let k = key("seg.ts");
        let d = Bytes::from_static(b"bytes");

        manager
            .put(k.clone(), d.clone(), CacheMetadata::new(d.len() as u64))
            .await
            .unwrap();
        manager.clear().await.unwrap();

        assert!(manager.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_manager_never_stores() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        config.enabled = false;
        let manager = CacheManager::new(config).await.unwrap();
        let k = key("seg.ts");

        manager
            .put(k.clone(), Bytes::from_static(b"x"), CacheMetadata::new(1))
            .await
            .unwrap();
        assert!(manager.get(&k).await.unwrap().is_none());
    }
}
