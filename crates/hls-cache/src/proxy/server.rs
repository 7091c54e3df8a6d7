//! # Local Proxy Endpoint
//!
//! The axum server standing in for the remote origin. Each request decodes
//! its path token back to the remote URL, consults the cache, and on a miss
//! delegates to the fetch coordinator (buffer-then-serve, which is fine at
//! typical HLS segment sizes). Playlists are rewritten to proxy URLs before
//! they are stored or served.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{CacheKey, CacheManager, CacheMetadata, CacheResourceType};
use crate::client::create_client;
use crate::config::ProxyConfig;
use crate::error::CacheProxyError;
use crate::fetch::{FetchCoordinator, FetchedResource};
use crate::proxy::range::{RangeOutcome, resolve_range};
use crate::proxy::token::{PROXY_PATH_PREFIX, ProxyUrlMapper};
use crate::rewrite::rewrite_playlist;

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

#[derive(Clone)]
struct ProxyState {
    cache: Arc<CacheManager>,
    fetcher: Arc<FetchCoordinator>,
    mapper: ProxyUrlMapper,
}

/// Handle to a running HLS caching proxy.
///
/// Explicitly constructed and threaded through callers rather than exposed
/// as a process-wide singleton; dropping the handle shuts the server down.
pub struct HlsCacheProxy {
    mapper: ProxyUrlMapper,
    cache: Arc<CacheManager>,
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
    maintenance_handle: JoinHandle<()>,
}

impl HlsCacheProxy {
    /// Bind the local endpoint and start serving.
    pub async fn start(config: ProxyConfig) -> Result<Self, CacheProxyError> {
        let client = create_client(&config)?;
        let cache = Arc::new(CacheManager::new(config.cache.clone()).await?);
        let fetcher = Arc::new(FetchCoordinator::new(client));

        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let mapper = ProxyUrlMapper::new(local_addr, config.strip_query_params.clone());

        let state = ProxyState {
            cache: cache.clone(),
            fetcher,
            mapper: mapper.clone(),
        };
        let router = Router::new()
            .route(
                &format!("{PROXY_PATH_PREFIX}/{{token}}/{{file_name}}"),
                get(serve_resource),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            let shutdown = async move {
                // Resolves on explicit shutdown or when the handle is dropped
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Proxy server terminated with error");
            }
        });

        let maintenance_handle = cache
            .clone()
            .start_maintenance_task(config.maintenance_interval);

        info!(addr = %local_addr, "HLS cache proxy listening");

        Ok(Self {
            mapper,
            cache,
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
            maintenance_handle,
        })
    }

    /// Address the local endpoint is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Pure transform from a remote HLS resource URL to its local proxy URL.
    ///
    /// Deterministic and side-effect free; `None` for URLs the proxy cannot
    /// serve (non-http scheme, missing host).
    pub fn reverse_proxy_url(&self, remote: &Url) -> Option<Url> {
        self.mapper.proxy_url(remote)
    }

    /// Remove every cached entry.
    ///
    /// Safe to call while fetches are in flight: such fetches complete and
    /// may write entries after the clear finishes. Failure to wipe the
    /// persistent store propagates.
    pub async fn clear_cache(&self) -> Result<(), CacheProxyError> {
        self.cache.clear().await.map_err(CacheProxyError::from)
    }

    /// Access to the underlying cache manager
    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Gracefully stop the server and background maintenance.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        self.maintenance_handle.abort();
    }
}

impl Drop for HlsCacheProxy {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.maintenance_handle.abort();
    }
}

async fn serve_resource(
    State(state): State<ProxyState>,
    Path((token, _file_name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let remote = match ProxyUrlMapper::decode_token(&token) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "Rejected request with undecodable token");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let Some(key) = CacheKey::for_remote(&remote, state.mapper.strip_query_params()) else {
        warn!(url = %remote, "Rejected request for uncacheable URL");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let (body, content_type) = match lookup_or_fetch(&state, &key, &remote).await {
        Ok(found) => found,
        Err(e) => return error_response(&e),
    };

    let content_type = content_type.unwrap_or_else(|| guess_content_type(&remote).to_string());
    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    serve_bytes(body, &content_type, range_header.as_deref())
}

/// Cache lookup with fetch-through on miss. Store read failures are logged
/// and treated as misses so a broken disk degrades to pass-through proxying
/// instead of breaking playback.
async fn lookup_or_fetch(
    state: &ProxyState,
    key: &CacheKey,
    remote: &Url,
) -> Result<(Bytes, Option<String>), CacheProxyError> {
    match state.cache.get(key).await {
        Ok(Some((bytes, metadata))) => {
            // A playlist rewritten by an earlier run can embed a stale
            // loopback port (port 0 binds pick a fresh one per start)
            if metadata.rewritten && !rewritten_for_this_endpoint(&bytes, &state.mapper) {
                debug!(url = %remote, "Cached playlist targets a stale endpoint; refetching");
            } else {
                debug!(url = %remote, "Cache hit");
                return Ok((bytes, metadata.content_type));
            }
        }
        Ok(None) => {}
        Err(e) => {
            error!(url = %remote, error = %e, "Cache lookup failed; falling through to origin");
        }
    }

    let FetchedResource { body, content_type } = state.fetcher.fetch(key, remote).await?;

    let (body, content_type, rewritten) = if is_playlist(key, content_type.as_deref(), &body) {
        rewrite_fetched_playlist(state, remote, body, content_type)
    } else {
        (body, content_type, false)
    };

    let metadata = CacheMetadata::new(body.len() as u64)
        .with_content_type_option(content_type.clone())
        .with_rewritten(rewritten);
    if let Err(e) = state.cache.put(key.clone(), body.clone(), metadata).await {
        error!(url = %remote, error = %e, "Failed to persist fetched resource");
    }

    Ok((body, content_type))
}

/// Whether a cached rewritten playlist points at the currently bound
/// endpoint. Playlists rewritten against another address must not be
/// served; their proxy URLs would dead-end.
fn rewritten_for_this_endpoint(body: &Bytes, mapper: &ProxyUrlMapper) -> bool {
    match std::str::from_utf8(body) {
        Ok(text) => text.contains(&mapper.local_prefix()),
        Err(_) => false,
    }
}

fn is_playlist(key: &CacheKey, content_type: Option<&str>, body: &Bytes) -> bool {
    if key.resource_type == CacheResourceType::Playlist {
        return true;
    }
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl")) {
        return true;
    }
    body.starts_with(b"#EXTM3U")
}

/// Rewrite a fetched playlist body. On any failure the original body is
/// served and cached as-is; partial caching beats failing playback.
fn rewrite_fetched_playlist(
    state: &ProxyState,
    remote: &Url,
    body: Bytes,
    content_type: Option<String>,
) -> (Bytes, Option<String>, bool) {
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(e) => {
            warn!(url = %remote, error = %e, "Playlist is not UTF-8; serving unrewritten");
            return (body, content_type, false);
        }
    };

    let base = match remote.join(".") {
        Ok(base) => base,
        Err(e) => {
            warn!(url = %remote, error = %e, "Cannot determine playlist base URL");
            return (body, content_type, false);
        }
    };

    match rewrite_playlist(text, &base, &state.mapper) {
        Ok(rewritten) => (
            Bytes::from(rewritten),
            Some(PLAYLIST_CONTENT_TYPE.to_string()),
            true,
        ),
        Err(e) => {
            warn!(url = %remote, error = %e, "Playlist rewrite failed; serving unrewritten");
            (body, content_type, false)
        }
    }
}

fn serve_bytes(body: Bytes, content_type: &str, range_header: Option<&str>) -> Response {
    let total_len = body.len() as u64;

    let result = match resolve_range(range_header, total_len) {
        RangeOutcome::Full => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, total_len)
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from(body)),
        RangeOutcome::Partial { start, end } => {
            let slice = body.slice(start as usize..=end as usize);
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, slice.len() as u64)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{total_len}"),
                )
                .body(Body::from(slice))
        }
        RangeOutcome::Unsatisfiable => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{total_len}"))
            .body(Body::empty()),
    };

    result.unwrap_or_else(|e| {
        error!(error = %e, "Failed to build response");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

fn error_response(error: &CacheProxyError) -> Response {
    let status = match error {
        // Origin 4xx mirrors through so the player sees the real status
        CacheProxyError::UpstreamStatus(s) if s.is_client_error() => *s,
        CacheProxyError::UpstreamStatus(_) | CacheProxyError::Network { .. } => {
            StatusCode::BAD_GATEWAY
        }
        CacheProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %error, status = %status, "Serving error response");
    status.into_response()
}

/// Content type by path extension, for origins that omit the header
fn guess_content_type(url: &Url) -> &'static str {
    let ext = url
        .path()
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "m3u8" | "m3u" => PLAYLIST_CONTENT_TYPE,
        "ts" => "video/mp2t",
        "mp4" | "m4s" | "m4v" => "video/mp4",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "vtt" => "text/vtt",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guesses() {
        let cases = [
            ("https://cdn.example/a/index.m3u8", PLAYLIST_CONTENT_TYPE),
            ("https://cdn.example/a/seg.ts", "video/mp2t"),
            ("https://cdn.example/a/init.mp4", "video/mp4"),
            ("https://cdn.example/a/frag.m4s", "video/mp4"),
            ("https://cdn.example/a/key.bin", "application/octet-stream"),
        ];
        for (url, expected) in cases {
            assert_eq!(guess_content_type(&Url::parse(url).unwrap()), expected);
        }
    }

    #[test]
    fn upstream_client_errors_mirror_through() {
        let resp = error_response(&CacheProxyError::UpstreamStatus(StatusCode::NOT_FOUND));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = error_response(&CacheProxyError::UpstreamStatus(
            StatusCode::INTERNAL_SERVER_ERROR,
        ));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn playlist_detection() {
        let playlist_key = CacheKey::new(
            CacheResourceType::Playlist,
            "https://cdn.example/index.m3u8",
        );
        let segment_key =
            CacheKey::new(CacheResourceType::Segment, "https://cdn.example/seg.ts");
        let body = Bytes::from_static(b"#EXTM3U\n");
        let binary = Bytes::from_static(b"\x47\x40\x11");

        assert!(is_playlist(&playlist_key, None, &binary));
        assert!(is_playlist(&segment_key, Some("application/vnd.apple.mpegurl"), &binary));
        assert!(is_playlist(&segment_key, None, &body));
        assert!(!is_playlist(&segment_key, Some("video/mp2t"), &binary));
    }

    #[test]
    fn stale_endpoint_detection() {
        let mapper = ProxyUrlMapper::new(([127, 0, 0, 1], 8080).into(), Vec::new());
        let current = Bytes::from_static(b"#EXTM3U\nhttp://127.0.0.1:8080/hls/tok/seg.ts\n");
        let stale = Bytes::from_static(b"#EXTM3U\nhttp://127.0.0.1:9/hls/tok/seg.ts\n");

        assert!(rewritten_for_this_endpoint(&current, &mapper));
        assert!(!rewritten_for_this_endpoint(&stale, &mapper));
    }

    #[test]
    fn range_serving_slices_payload() {
        let body = Bytes::from_static(b"0123456789");
        let resp = serve_bytes(body.clone(), "video/mp2t", Some("bytes=2-5"));
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            resp.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes 2-5/10"
        );
        assert_eq!(resp.headers().get(header::CONTENT_LENGTH).unwrap(), "4");

        let resp = serve_bytes(body, "video/mp2t", Some("bytes=100-"));
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }
}
