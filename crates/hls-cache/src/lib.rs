//! # HLS Cache Engine
//!
//! A local caching reverse proxy for HLS playback. Remote playlist and
//! segment URLs are mapped to a loopback endpoint; fetched playlists are
//! rewritten so every referenced resource also flows through the proxy,
//! and fetched bodies are cached across a memory and a disk tier.
//!
//! ## Features
//!
//! - Reversible remote-to-local URL transform
//! - Line-oriented playlist rewriting (segments, variants, key/map URIs)
//! - Two-tier cache (memory front, persistent disk store)
//! - Single-flight fetch coordination for concurrent misses
//! - Range request support for cached segments

pub mod builder;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod proxy;
pub mod rewrite;

pub use builder::ProxyConfigBuilder;
pub use cache::{CacheConfig, CacheKey, CacheManager, CacheMetadata, CacheResourceType};
pub use client::create_client;
pub use config::ProxyConfig;
pub use error::CacheProxyError;
pub use fetch::{FetchCoordinator, FetchOutcome, FetchedResource};
pub use proxy::{HlsCacheProxy, PROXY_PATH_PREFIX, ProxyUrlMapper};
pub use rewrite::rewrite_playlist;
