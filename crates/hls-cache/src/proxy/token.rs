//! # Proxy URL Mapping
//!
//! The reversible local-for-remote URL transform. A remote resource URL is
//! canonicalized and embedded into the local endpoint path as a URL-safe
//! base64 token; the remote path's file name is kept as a trailing segment
//! so players still see the `.m3u8`/`.ts` extension.

use std::net::SocketAddr;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

use crate::cache::canonicalize_remote_url;
use crate::error::CacheProxyError;

/// Path prefix of the local proxy endpoint
pub const PROXY_PATH_PREFIX: &str = "/hls";

/// Maps remote HLS resource URLs to local proxy URLs and back
#[derive(Debug, Clone)]
pub struct ProxyUrlMapper {
    local_base: Url,
    strip_query_params: Arc<Vec<String>>,
}

impl ProxyUrlMapper {
    pub fn new(local_addr: SocketAddr, strip_query_params: Vec<String>) -> Self {
        let local_base = Url::parse(&format!("http://{local_addr}/"))
            .expect("socket address always forms a valid URL");
        Self {
            local_base,
            strip_query_params: Arc::new(strip_query_params),
        }
    }

    /// The pure local-for-remote transform.
    ///
    /// Deterministic and side-effect free; `None` only for URLs that are
    /// not proxyable (non-http scheme, missing host).
    pub fn proxy_url(&self, remote: &Url) -> Option<Url> {
        let canonical = canonicalize_remote_url(remote, &self.strip_query_params)?;
        let token = URL_SAFE_NO_PAD.encode(canonical.as_str().as_bytes());
        let file_name = canonical
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("resource");

        let mut url = self.local_base.clone();
        url.set_path(&format!("{PROXY_PATH_PREFIX}/{token}/{file_name}"));
        Some(url)
    }

    /// Reverse transform: decode a path token back to the canonical remote URL.
    pub fn decode_token(token: &str) -> Result<Url, CacheProxyError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| CacheProxyError::InvalidUrl(format!("Bad proxy token: {e}")))?;
        let url_str = String::from_utf8(bytes)
            .map_err(|e| CacheProxyError::InvalidUrl(format!("Proxy token is not UTF-8: {e}")))?;
        Url::parse(&url_str)
            .map_err(|e| CacheProxyError::InvalidUrl(format!("Proxy token is not a URL: {e}")))
    }

    /// Prefix shared by every URL this mapper produces, e.g.
    /// `http://127.0.0.1:8080/hls/`
    pub fn local_prefix(&self) -> String {
        let mut url = self.local_base.clone();
        url.set_path(PROXY_PATH_PREFIX);
        format!("{url}/")
    }

    /// Query parameter names stripped during canonicalization
    pub fn strip_query_params(&self) -> &[String] {
        &self.strip_query_params
    }
}
