//! # Upstream HTTP Client
//!
//! Construction of the reqwest client used for origin fetches.

use reqwest::Client;
use tracing::debug;

use crate::config::ProxyConfig;
use crate::error::CacheProxyError;

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &ProxyConfig) -> Result<Client, CacheProxyError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5) // Allow multiple connections to same host
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    debug!(
        user_agent = %config.user_agent,
        follow_redirects = config.follow_redirects,
        "Created upstream HTTP client"
    );

    client_builder.build().map_err(CacheProxyError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = ProxyConfig::default();
        assert!(create_client(&config).is_ok());
    }

    #[test]
    fn zero_timeouts_build() {
        let mut config = ProxyConfig::default();
        config.timeout = std::time::Duration::ZERO;
        config.connect_timeout = std::time::Duration::ZERO;
        assert!(create_client(&config).is_ok());
    }
}
