//! HTTP Range header parsing (RFC 7233, single `bytes=` ranges)
//!
//! Multi-range requests and non-byte units are deliberately ignored and
//! answered with the full resource.

/// A satisfiable byte range within a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpec {
    /// First byte position (inclusive)
    pub start: usize,
    /// Last byte position (inclusive); None means until end of resource
    pub end: Option<usize>,
}

impl RangeSpec {
    /// Resolve the inclusive end position against the resource size
    #[inline]
    #[must_use]
    pub fn end_position(&self, size: usize) -> usize {
        self.end.unwrap_or_else(|| size.saturating_sub(1))
    }

    #[cfg(test)]
    pub fn len(&self, size: usize) -> usize {
        self.end_position(size).saturating_sub(self.start) + 1
    }
}

/// Outcome of parsing a Range header
#[derive(Debug)]
pub enum RangeOutcome {
    /// A single satisfiable range
    Satisfiable(RangeSpec),
    /// Syntactically valid but outside the resource; respond 416
    Unsatisfiable,
    /// Absent, malformed, multi-range, or non-byte unit; serve the full body
    Ignored,
}

/// Parse a `Range` header value against the resource size
///
/// Accepted forms: `bytes=start-end`, `bytes=start-`, `bytes=-suffix`.
///
/// # Examples
/// ```
/// use blitz::http::range::{parse_range_header, RangeOutcome};
///
/// assert!(matches!(
///     parse_range_header(Some("bytes=0-99"), 1000),
///     RangeOutcome::Satisfiable(_)
/// ));
/// assert!(matches!(parse_range_header(None, 1000), RangeOutcome::Ignored));
/// ```
#[must_use]
pub fn parse_range_header(header: Option<&str>, size: usize) -> RangeOutcome {
    let Some(spec) = header.and_then(|h| h.strip_prefix("bytes=")) else {
        return RangeOutcome::Ignored;
    };

    // Single range only
    if spec.contains(',') {
        return RangeOutcome::Ignored;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeOutcome::Ignored;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        parse_suffix(end_str, size)
    } else {
        parse_bounded(start_str, end_str, size)
    }
}

/// `-suffix`: the last `suffix` bytes of the resource
fn parse_suffix(suffix_str: &str, size: usize) -> RangeOutcome {
    let Ok(suffix) = suffix_str.parse::<usize>() else {
        return RangeOutcome::Ignored;
    };
    // No byte in an empty resource can satisfy a range
    if suffix == 0 || size == 0 {
        return RangeOutcome::Unsatisfiable;
    }
    // A suffix longer than the resource selects the whole resource
    RangeOutcome::Satisfiable(RangeSpec {
        start: size.saturating_sub(suffix),
        end: Some(size.saturating_sub(1)),
    })
}

/// `start-` or `start-end`
fn parse_bounded(start_str: &str, end_str: &str, size: usize) -> RangeOutcome {
    let Ok(start) = start_str.parse::<usize>() else {
        return RangeOutcome::Ignored;
    };
    if start >= size {
        return RangeOutcome::Unsatisfiable;
    }

    let end = if end_str.is_empty() {
        None
    } else {
        match end_str.parse::<usize>() {
            // Clamp to the last byte of the resource
            Ok(e) => Some(e.min(size - 1)),
            Err(_) => return RangeOutcome::Ignored,
        }
    };

    if matches!(end, Some(e) if start > e) {
        return RangeOutcome::Unsatisfiable;
    }

    RangeOutcome::Satisfiable(RangeSpec { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_header() {
        assert!(matches!(parse_range_header(None, 100), RangeOutcome::Ignored));
    }

    #[test]
    fn test_bounded_range() {
        match parse_range_header(Some("bytes=0-9"), 100) {
            RangeOutcome::Satisfiable(r) => {
                assert_eq!(r.start, 0);
                assert_eq!(r.end, Some(9));
                assert_eq!(r.len(100), 10);
            }
            _ => panic!("expected satisfiable range"),
        }
    }

    #[test]
    fn test_open_range() {
        match parse_range_header(Some("bytes=50-"), 100) {
            RangeOutcome::Satisfiable(r) => {
                assert_eq!(r.start, 50);
                assert_eq!(r.end, None);
                assert_eq!(r.end_position(100), 99);
                assert_eq!(r.len(100), 50);
            }
            _ => panic!("expected satisfiable range"),
        }
    }

    #[test]
    fn test_suffix_range() {
        match parse_range_header(Some("bytes=-20"), 100) {
            RangeOutcome::Satisfiable(r) => {
                assert_eq!(r.start, 80);
                assert_eq!(r.end, Some(99));
            }
            _ => panic!("expected satisfiable range"),
        }
    }

    #[test]
    fn test_oversized_suffix_selects_whole_resource() {
        match parse_range_header(Some("bytes=-500"), 100) {
            RangeOutcome::Satisfiable(r) => {
                assert_eq!(r.start, 0);
                assert_eq!(r.end, Some(99));
            }
            _ => panic!("expected satisfiable range"),
        }
    }

    #[test]
    fn test_end_clamped_to_resource() {
        match parse_range_header(Some("bytes=10-5000"), 100) {
            RangeOutcome::Satisfiable(r) => assert_eq!(r.end, Some(99)),
            _ => panic!("expected satisfiable range"),
        }
    }

    #[test]
    fn test_unsatisfiable() {
        assert!(matches!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeOutcome::Unsatisfiable
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=-0"), 100),
            RangeOutcome::Unsatisfiable
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=9-5"), 100),
            RangeOutcome::Unsatisfiable
        ));
    }

    #[test]
    fn test_empty_resource_is_unsatisfiable() {
        assert!(matches!(
            parse_range_header(Some("bytes=-1"), 0),
            RangeOutcome::Unsatisfiable
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=-500"), 0),
            RangeOutcome::Unsatisfiable
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=0-"), 0),
            RangeOutcome::Unsatisfiable
        ));
    }

    #[test]
    fn test_ignored_forms() {
        assert!(matches!(
            parse_range_header(Some("bytes=a-b"), 100),
            RangeOutcome::Ignored
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=0-9,20-29"), 100),
            RangeOutcome::Ignored
        ));
        assert!(matches!(
            parse_range_header(Some("items=0-9"), 100),
            RangeOutcome::Ignored
        ));
    }
}
