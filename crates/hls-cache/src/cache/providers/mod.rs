//! # Cache Providers
//!
//! Implementations of the [`CacheProvider`] trait: a moka-backed memory tier
//! and a persistent file tier.

pub mod file;
pub mod memory;
pub mod provider;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use provider::CacheProvider;
