//! # Builder for ProxyConfig
//!
//! Fluent builder for creating and customizing [`ProxyConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hls_cache_engine::ProxyConfig;
//!
//! let config = ProxyConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("MyPlayer/1.0")
//!     .with_strip_query_param("auth_key")
//!     .with_caching_enabled(true)
//!     .build();
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::ProxyConfig;
use crate::cache::CacheConfig;

/// Builder for creating ProxyConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct ProxyConfigBuilder {
    /// Internal config being built
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProxyConfig::default(),
        }
    }

    /// Set the address the local endpoint binds to
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the cache configuration
    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Enable or disable caching
    pub fn with_caching_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    /// Set the disk cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.disk_cache_path = Some(dir.into());
        self
    }

    /// Set the maximum total disk cache size in bytes
    pub fn with_max_disk_cache_size(mut self, bytes: u64) -> Self {
        self.config.cache.max_disk_cache_size = bytes;
        self
    }

    /// Set the overall timeout for upstream requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether upstream fetches follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header for upstream fetches
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Set all HTTP headers, replacing any existing headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Add a query parameter name to strip during key canonicalization
    pub fn with_strip_query_param(mut self, name: impl Into<String>) -> Self {
        self.config.strip_query_params.push(name.into());
        self
    }

    /// Replace the set of stripped query parameter names
    pub fn with_strip_query_params(mut self, names: Vec<String>) -> Self {
        self.config.strip_query_params = names;
        self
    }

    /// Set the background maintenance interval
    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.config.maintenance_interval = interval;
        self
    }

    /// Build the ProxyConfig instance
    pub fn build(self) -> ProxyConfig {
        self.config
    }
}

impl Default for ProxyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builder_defaults() {
        let config = ProxyConfigBuilder::new().build();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.follow_redirects);
        assert!(config.cache.enabled);
        assert_eq!(config.bind_addr.port(), 0);
        assert!(config.bind_addr.ip().is_loopback());
        assert!(
            config
                .strip_query_params
                .iter()
                .any(|p| p == "x-amz-signature")
        );
    }

    #[test]
    fn builder_customization() {
        let config = ProxyConfigBuilder::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_follow_redirects(false)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_strip_query_param("auth_key")
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert!(config.strip_query_params.iter().any(|p| p == "auth_key"));

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn caching_options() {
        let config_with_cache = ProxyConfigBuilder::new().with_caching_enabled(true).build();
        assert!(config_with_cache.cache.enabled);

        let config_without_cache = ProxyConfigBuilder::new()
            .with_caching_enabled(false)
            .build();
        assert!(!config_without_cache.cache.enabled);

        let config_sized = ProxyConfigBuilder::new()
            .with_cache_dir("/tmp/hls")
            .with_max_disk_cache_size(42)
            .build();
        assert_eq!(
            config_sized.cache.disk_cache_path.as_deref(),
            Some(std::path::Path::new("/tmp/hls"))
        );
        assert_eq!(config_sized.cache.max_disk_cache_size, 42);
    }
}
