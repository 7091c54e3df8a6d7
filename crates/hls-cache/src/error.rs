use std::sync::Arc;

use reqwest::StatusCode;

/// Error type for the caching proxy.
///
/// The type is `Clone` so a single fetch outcome can be fanned out to every
/// waiter of an in-flight fetch; non-cloneable sources are wrapped in `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheProxyError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("Network error: {source}")]
    Network {
        #[source]
        source: Arc<reqwest::Error>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Playlist parse error: {0}")]
    PlaylistParse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for CacheProxyError {
    fn from(e: reqwest::Error) -> Self {
        CacheProxyError::Network {
            source: Arc::new(e),
        }
    }
}

impl From<std::io::Error> for CacheProxyError {
    fn from(e: std::io::Error) -> Self {
        CacheProxyError::Io {
            source: Arc::new(e),
        }
    }
}
