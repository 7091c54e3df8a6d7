//! # Playlist Rewriter
//!
//! Line-oriented M3U8 rewriting. Every URI reference in a playlist
//! (segment and sub-playlist lines, plus `URI="..."` attributes in key,
//! map, media and I-frame tags) is resolved against the playlist's base URL
//! and replaced with its local proxy URL, so subsequent fetches are also
//! intercepted. Tags, comments and blank lines pass through unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};
use url::Url;

use crate::error::CacheProxyError;
use crate::proxy::ProxyUrlMapper;

/// Tags carrying a URI attribute that must be rewritten; leaving any of
/// them untouched makes those fetches bypass the cache.
const URI_ATTR_TAGS: [&str; 5] = [
    "#EXT-X-KEY",
    "#EXT-X-SESSION-KEY",
    "#EXT-X-MAP",
    "#EXT-X-MEDIA",
    "#EXT-X-I-FRAME-STREAM-INF",
];

static URI_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"URI="([^"]*)""#).expect("static pattern compiles"));

/// Rewrite a playlist body so every referenced resource points at the
/// local proxy.
///
/// Returns `PlaylistParse` when the body is not a valid M3U8 playlist; the
/// caller is expected to serve the unmodified original in that case, since
/// partial caching beats failing playback.
pub fn rewrite_playlist(
    body: &str,
    base: &Url,
    mapper: &ProxyUrlMapper,
) -> Result<String, CacheProxyError> {
    if let Err(e) = m3u8_rs::parse_playlist_res(body.as_bytes()) {
        return Err(CacheProxyError::PlaylistParse(format!(
            "Not a valid M3U8 playlist: {e}"
        )));
    }

    let mut out = String::with_capacity(body.len() * 2);
    let mut rewritten_count = 0usize;

    for line in body.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            if URI_ATTR_TAGS.iter().any(|tag| {
                trimmed
                    .strip_prefix(tag)
                    .is_some_and(|rest| rest.starts_with(':'))
            }) {
                let replaced = URI_ATTR_RE.replace_all(line, |caps: &Captures| {
                    match resolve_and_map(&caps[1], base, mapper) {
                        Some(local) => {
                            rewritten_count += 1;
                            format!("URI=\"{local}\"")
                        }
                        None => caps[0].to_string(),
                    }
                });
                out.push_str(&replaced);
            } else {
                out.push_str(line);
            }
        } else if trimmed.is_empty() {
            out.push_str(line);
        } else {
            // A URI line referencing a segment or sub-playlist
            match resolve_and_map(trimmed, base, mapper) {
                Some(local) => {
                    rewritten_count += 1;
                    out.push_str(local.as_str());
                }
                None => {
                    warn!(uri = trimmed, "Leaving unproxyable playlist URI untouched");
                    out.push_str(line);
                }
            }
        }
        out.push('\n');
    }

    debug!(uris = rewritten_count, "Rewrote playlist to proxy URLs");
    Ok(out)
}

fn resolve_and_map(reference: &str, base: &Url, mapper: &ProxyUrlMapper) -> Option<Url> {
    let absolute = base.join(reference).ok()?;
    mapper.proxy_url(&absolute)
}
