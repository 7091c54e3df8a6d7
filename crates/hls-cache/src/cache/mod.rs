//! # Cache System
//!
//! Two-tier cache for proxied HLS resources: a moka memory tier in front of
//! a persistent on-disk tier keyed by the hash of the canonical remote URL.
//! Entries survive restarts; the disk tier is bounded by an oldest-first
//! eviction sweep.

mod manager;
pub mod providers;
mod types;

pub use manager::CacheManager;
pub use types::{
    CacheConfig, CacheKey, CacheLookupResult, CacheMetadata, CacheResourceType, CacheResult,
    canonicalize_remote_url,
};

pub use providers::{CacheProvider, FileCache, MemoryCache};
