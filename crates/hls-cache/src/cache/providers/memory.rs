//! # Memory Cache Provider
//!
//! In-memory cache tier using Moka with size-weighted eviction. Playback
//! hits for recently proxied playlists and segments are served from here
//! without touching the disk tier.

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::providers::CacheProvider;
use crate::cache::types::{CacheKey, CacheLookupResult, CacheMetadata, CacheResult};

/// Entry in the memory cache
#[derive(Clone)]
struct CacheEntry {
    /// Cached data bytes
    data: Bytes,
    /// Metadata for the cached content
    metadata: CacheMetadata,
}

/// Memory cache provider implementation using Moka
#[derive(Clone)]
pub struct MemoryCache {
    /// Moka cache for storing entries
    cache: MokaCache<CacheKey, CacheEntry>,
    /// Maximum size for this cache in bytes
    max_size: u64,
}

impl MemoryCache {
    /// Create a new memory cache with the specified size limit
    pub fn new(max_size_bytes: u64) -> Self {
        if max_size_bytes == 0 {
            panic!("Memory cache size must be greater than zero");
        }

        // Size based eviction
        let cache = MokaCache::builder()
            .weigher(|_k, v: &CacheEntry| v.data.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(max_size = max_size_bytes, "Memory cache created");

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }
}

#[async_trait::async_trait]
impl CacheProvider for MemoryCache {
    async fn contains(&self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn get(&self, key: &CacheKey) -> CacheLookupResult {
        if let Some(entry) = self.cache.get(key).await {
            return Ok(Some((entry.data.clone(), entry.metadata.clone())));
        }
        Ok(None)
    }

    async fn put(&self, key: CacheKey, data: Bytes, metadata: CacheMetadata) -> CacheResult<()> {
        // A single entry larger than the whole tier is never admitted
        if metadata.size > self.max_size {
            warn!(
                key = ?key,
                size = metadata.size,
                max_size = self.max_size,
                "Entry too large for memory cache, skipping"
            );
            return Ok(());
        }

        self.cache.insert(key, CacheEntry { data, metadata }).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        if self.cache.get(key).await.is_some() {
            self.cache.invalidate(key).await;
            debug!(key = ?key, "Removed entry from memory cache");
        }
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        debug!("Memory cache cleared");
        Ok(())
    }

    async fn sweep(&self) -> CacheResult<()> {
        // Moka enforces the size bound internally; run_pending_tasks makes
        // eviction eager.
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::CacheResourceType;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(
            CacheResourceType::Segment,
            format!("https://cdn.example/{name}"),
        )
    }

    fn data(content: &str) -> Bytes {
        Bytes::from(content.to_string())
    }

    fn metadata(size: u64) -> CacheMetadata {
        CacheMetadata::new(size).with_content_type("video/mp2t")
    }

    #[tokio::test]
    async fn put_get_hit() {
        let cache = MemoryCache::new(100);
        let k = key("seg1.ts");
        let d = data("hello");
        let m = metadata(d.len() as u64);

        cache.put(k.clone(), d.clone(), m.clone()).await.unwrap();
        cache.cache.run_pending_tasks().await; // Settle after put

        let (res_d, res_m) = cache.get(&k).await.unwrap().expect("expected hit");
        assert_eq!(res_d, d);
        assert_eq!(res_m.size, m.size);
        assert_eq!(res_m.content_type, m.content_type);
    }

    #[tokio::test]
    async fn get_miss() {
        let cache = MemoryCache::new(100);
        assert!(cache.get(&key("absent.ts")).await.unwrap().is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "Memory cache size must be greater than zero")]
    async fn zero_size_panics() {
        MemoryCache::new(0);
    }

    #[tokio::test]
    async fn oversized_entry_not_admitted() {
        let cache = MemoryCache::new(10);
        let k = key("big.ts");
        let d = data("this payload is larger than ten bytes");
        let m = metadata(d.len() as u64);

        cache.put(k.clone(), d, m).await.unwrap();
        cache.cache.run_pending_tasks().await;

        assert!(!cache.contains(&k).await.unwrap());
    }

    #[tokio::test]
    async fn double_put_updates_value() {
        let cache = MemoryCache::new(100);
        let k = key("seg.ts");
        let d1 = data("value1");
        let d2 = data("new_val");

        cache
            .put(k.clone(), d1.clone(), metadata(d1.len() as u64))
            .await
            .unwrap();
        cache
            .put(k.clone(), d2.clone(), metadata(d2.len() as u64))
            .await
            .unwrap();
        cache.cache.run_pending_tasks().await;

        let (res, _) = cache.get(&k).await.unwrap().expect("hit after second put");
        assert_eq!(res, d2);
        assert_eq!(cache.cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let cache = MemoryCache::new(100);
        let k1 = key("a.ts");
        let k2 = key("b.ts");
        let d = data("data");

        cache
            .put(k1.clone(), d.clone(), metadata(d.len() as u64))
            .await
            .unwrap();
        cache
            .put(k2.clone(), d.clone(), metadata(d.len() as u64))
            .await
            .unwrap();
        cache.cache.run_pending_tasks().await;

        cache.clear().await.unwrap();
        cache.cache.run_pending_tasks().await;

        assert!(!cache.contains(&k1).await.unwrap());
        assert!(!cache.contains(&k2).await.unwrap());
        assert_eq!(cache.cache.entry_count(), 0);
    }
}
