//! # Cache Types
//!
//! Common types used across the caching system: keys, per-entry metadata
//! and the cache configuration.

use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Types of resources that can be cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResourceType {
    /// Master or media playlist
    Playlist,
    /// Media segment, init segment or decryption key
    Segment,
}

impl CacheResourceType {
    /// Classify a remote URL by its path extension.
    pub fn for_url(url: &Url) -> Self {
        let path = url.path();
        let ext = path.rsplit('.').next().unwrap_or_default();
        if ext.eq_ignore_ascii_case("m3u8") || ext.eq_ignore_ascii_case("m3u") {
            CacheResourceType::Playlist
        } else {
            CacheResourceType::Segment
        }
    }
}

/// Canonicalize a remote URL for use as a cache identity.
///
/// Returns `None` for non-http(s) schemes or URLs without a host. The result
/// has the fragment removed and every query parameter whose name matches one
/// of `strip_params` (case-insensitive) dropped, so that ephemeral signing
/// tokens do not defeat the cache. The remaining query keeps its order.
pub fn canonicalize_remote_url(url: &Url, strip_params: &[String]) -> Option<Url> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }

    let mut canonical = url.clone();
    canonical.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !strip_params.iter().any(|s| s.eq_ignore_ascii_case(name)))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        canonical.set_query(None);
        if !kept.is_empty() {
            let mut pairs = canonical.query_pairs_mut();
            for (name, value) in &kept {
                pairs.append_pair(name, value);
            }
        }
    }

    Some(canonical)
}

/// Cache key for identifying resources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Type of resource
    pub resource_type: CacheResourceType,
    /// Canonical URL of the resource
    pub url: String,
}

impl CacheKey {
    /// Create a cache key from an already canonical URL.
    pub fn new(resource_type: CacheResourceType, url: impl Into<String>) -> Self {
        Self {
            resource_type,
            url: url.into(),
        }
    }

    /// Derive the key for a remote resource, canonicalizing its URL.
    ///
    /// Returns `None` when the URL is not cacheable (non-http scheme,
    /// missing host).
    pub fn for_remote(url: &Url, strip_params: &[String]) -> Option<Self> {
        let canonical = canonicalize_remote_url(url, strip_params)?;
        Some(Self {
            resource_type: CacheResourceType::for_url(&canonical),
            url: canonical.into(),
        })
    }

    /// Convert to a filename-safe string
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}:{}", self.resource_type, self.url));
        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

/// Metadata for a cached resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the resource was cached (seconds since the Unix epoch)
    pub cached_at: u64,
    /// Content type of the resource as reported by the origin
    pub content_type: Option<String>,
    /// Size of the cached payload in bytes
    pub size: u64,
    /// Whether the payload is a playlist rewritten to proxy URLs
    pub rewritten: bool,
}

impl CacheMetadata {
    /// Create new metadata for a resource
    pub fn new(size: u64) -> Self {
        Self {
            cached_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            content_type: None,
            size,
            rewritten: false,
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the content type as an Option
    pub fn with_content_type_option(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    /// Mark the payload as a rewritten playlist
    pub fn with_rewritten(mut self, rewritten: bool) -> Self {
        self.rewritten = rewritten;
        self
    }
}

/// Configuration for the cache system
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Path for disk cache storage
    pub disk_cache_path: Option<PathBuf>,
    /// Maximum total size of the disk cache in bytes
    pub max_disk_cache_size: u64,
    /// Maximum size of the memory cache in bytes
    pub max_memory_cache_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disk_cache_path: None, // If None, we'll use system temp dir
            max_disk_cache_size: 500 * 1024 * 1024, // 500MB
            max_memory_cache_size: 30 * 1024 * 1024, // 30MB
        }
    }
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;

/// A type representing the result of a cache lookup operation
pub type CacheLookupResult = CacheResult<Option<(Bytes, CacheMetadata)>>;
