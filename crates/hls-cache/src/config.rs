use std::net::SocketAddr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::cache::CacheConfig;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Configurable options for the caching proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address the local proxy endpoint binds to; port 0 picks a free port
    pub bind_addr: SocketAddr,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Query parameter names (case-insensitive) removed during cache-key
    /// canonicalization. Signed CDN URLs rotate these on every playback
    /// attempt; leaving them in the key turns every request into a miss.
    pub strip_query_params: Vec<String>,

    /// Overall timeout for an upstream HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects on upstream fetches
    pub follow_redirects: bool,

    /// User agent string for upstream fetches
    pub user_agent: String,

    /// Custom HTTP headers for upstream fetches
    pub headers: HeaderMap,

    /// Interval between background cache maintenance runs
    pub maintenance_interval: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 0).into(),
            cache: CacheConfig::default(),
            strip_query_params: default_strip_query_params(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ProxyConfig::get_default_headers(),
            maintenance_interval: Duration::from_secs(60),
        }
    }
}

impl ProxyConfig {
    pub fn builder() -> crate::builder::ProxyConfigBuilder {
        crate::builder::ProxyConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}

/// Query parameters commonly used for ephemeral URL signing.
///
/// Covers CloudFront (`Expires`/`Signature`/`Key-Pair-Id`/`Policy`),
/// S3 presigned URLs (`X-Amz-*`) and the generic token names several CDNs
/// use.
pub fn default_strip_query_params() -> Vec<String> {
    [
        "token",
        "sign",
        "signature",
        "expires",
        "expire",
        "policy",
        "key-pair-id",
        "x-amz-algorithm",
        "x-amz-credential",
        "x-amz-date",
        "x-amz-expires",
        "x-amz-security-token",
        "x-amz-signature",
        "x-amz-signedheaders",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
