//! # HTTP Range Resolution
//!
//! Single-range `Range` header handling for cached payloads. HLS players
//! issue range requests when resuming segments, so the local endpoint must
//! answer `206` with correct `Content-Range` headers.

/// How a request's `Range` header maps onto a payload of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No range requested (or an unsupported multi-range): serve the full body
    Full,
    /// Serve bytes `start..=end` with a 206 response
    Partial { start: u64, end: u64 },
    /// The requested range cannot be satisfied: respond 416
    Unsatisfiable,
}

/// Resolve a `Range` header value against a payload length.
///
/// Supports the single-range forms `bytes=a-b`, `bytes=a-` and `bytes=-n`.
/// Syntactically invalid headers and multi-range requests fall back to
/// serving the full body, which is always a correct response.
pub fn resolve_range(header: Option<&str>, len: u64) -> RangeOutcome {
    let Some(header) = header else {
        return RangeOutcome::Full;
    };

    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return RangeOutcome::Full;
    };

    if spec.contains(',') {
        // Multi-range: not supported, serve everything
        return RangeOutcome::Full;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let start_str = start_str.trim();
    let end_str = end_str.trim();

    if start_str.is_empty() {
        // Suffix form: last n bytes
        let Ok(suffix) = end_str.parse::<u64>() else {
            return RangeOutcome::Full;
        };
        if suffix == 0 || len == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        let start = len.saturating_sub(suffix);
        return RangeOutcome::Partial {
            start,
            end: len - 1,
        };
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return RangeOutcome::Full;
    };
    if start >= len {
        return RangeOutcome::Unsatisfiable;
    }

    let end = if end_str.is_empty() {
        len - 1
    } else {
        match end_str.parse::<u64>() {
            Ok(end) => end.min(len - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };

    if end < start {
        return RangeOutcome::Unsatisfiable;
    }

    RangeOutcome::Partial { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_header_serves_full() {
        assert_eq!(resolve_range(None, 100), RangeOutcome::Full);
    }

    #[test]
    fn bounded_range() {
        assert_eq!(
            resolve_range(Some("bytes=0-3"), 100),
            RangeOutcome::Partial { start: 0, end: 3 }
        );
        assert_eq!(
            resolve_range(Some("bytes=10-19"), 100),
            RangeOutcome::Partial { start: 10, end: 19 }
        );
    }

    #[test]
    fn open_ended_range() {
        assert_eq!(
            resolve_range(Some("bytes=95-"), 100),
            RangeOutcome::Partial { start: 95, end: 99 }
        );
    }

    #[test]
    fn suffix_range() {
        assert_eq!(
            resolve_range(Some("bytes=-10"), 100),
            RangeOutcome::Partial { start: 90, end: 99 }
        );
        // Suffix longer than the payload clamps to the whole payload
        assert_eq!(
            resolve_range(Some("bytes=-500"), 100),
            RangeOutcome::Partial { start: 0, end: 99 }
        );
    }

    #[test]
    fn end_clamped_to_payload() {
        assert_eq!(
            resolve_range(Some("bytes=50-5000"), 100),
            RangeOutcome::Partial { start: 50, end: 99 }
        );
    }

    #[test]
    fn unsatisfiable_ranges() {
        assert_eq!(
            resolve_range(Some("bytes=100-"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            resolve_range(Some("bytes=200-300"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            resolve_range(Some("bytes=-0"), 100),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn malformed_headers_fall_back_to_full() {
        assert_eq!(resolve_range(Some("items=0-3"), 100), RangeOutcome::Full);
        assert_eq!(resolve_range(Some("bytes=abc-def"), 100), RangeOutcome::Full);
        assert_eq!(resolve_range(Some("bytes=0-3,5-9"), 100), RangeOutcome::Full);
        assert_eq!(resolve_range(Some("bytes="), 100), RangeOutcome::Full);
    }
}
