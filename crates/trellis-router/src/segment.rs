//! URL path segmentation
//!
//! Tokenizes a URL path into typed segments: the leading separator (root),
//! literal segments, `:name` parameters and `*name` catch-alls. Registration
//! and per-request resolution both run on the same tokenizer, so the two
//! sides can never disagree about segment boundaries.

/// The path separator character.
pub const SEPARATOR: char = '/';

/// Classification of a single path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text, matched byte-for-byte.
    Normal,
    /// The leading separator. Always and only segment 0.
    Root,
    /// `:name` - captures the literal text of one request segment.
    Param,
    /// `*name` - catch-all marker, lowest matching priority.
    CatchAll,
}

/// One slash-delimited component of a URL path.
///
/// For `Param` and `CatchAll` segments the value keeps its marker character,
/// so `/users/:id` yields a segment with value `":id"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub value: String,
    pub kind: SegmentKind,
}

impl PathSegment {
    pub fn new(value: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    /// Parameter name for wildcard segments: the value without its marker.
    pub fn wildcard_name(&self) -> &str {
        match self.kind {
            SegmentKind::Param | SegmentKind::CatchAll => &self.value[1..],
            _ => &self.value,
        }
    }
}

/// Ordered segment sequence. Index 0 is always `Root`, size >= 1.
pub type PathSegments = Vec<PathSegment>;

/// Split `path` into typed segments.
///
/// The input must be non-empty and is expected to start with the separator
/// (callers validate first). Returns the segments and a validity flag: a
/// marker character encountered while the current segment is already a
/// wildcard flips the flag to `false`, but scanning continues so callers can
/// still inspect the full sequence for diagnostics.
///
/// A trailing separator produces one extra, empty-valued `Normal` segment,
/// which keeps `/users` and `/users/` distinct routes.
///
/// Pure and safe to call concurrently; allocation is bounded by path length.
pub fn segment(path: &str) -> (PathSegments, bool) {
    let bytes = path.as_bytes();
    let mut segments: PathSegments = Vec::with_capacity(8);
    segments.push(PathSegment::new(&path[..1], SegmentKind::Root));

    let mut valid = true;
    // index of the separator opening the current segment
    let mut begin = 0usize;
    let mut kind = SegmentKind::Normal;

    for idx in 1..bytes.len() {
        let c = bytes[idx];
        let last = idx == bytes.len() - 1;

        if c == b'/' || last {
            // the final segment keeps its last character unless that
            // character is itself the separator
            let end = if last && c != b'/' { idx + 1 } else { idx };
            segments.push(PathSegment::new(&path[begin + 1..end], kind));
            if last && c == b'/' {
                // implicit trailing position
                segments.push(PathSegment::new("", SegmentKind::Normal));
            }
            begin = idx;
            kind = SegmentKind::Normal;
        }

        match c {
            b':' => {
                if kind != SegmentKind::Normal {
                    valid = false;
                }
                kind = SegmentKind::Param;
            }
            b'*' => {
                if kind != SegmentKind::Normal {
                    valid = false;
                }
                kind = SegmentKind::CatchAll;
            }
            _ => {}
        }
    }

    (segments, valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejoin(segments: &PathSegments) -> String {
        let mut s = segments[0].value.clone();
        s.push_str(
            &segments[1..]
                .iter()
                .map(|seg| seg.value.as_str())
                .collect::<Vec<_>>()
                .join("/"),
        );
        s
    }

    fn kinds(segments: &PathSegments) -> Vec<SegmentKind> {
        segments.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_root_only() {
        let (segments, valid) = segment("/");
        assert!(valid);
        assert_eq!(segments, vec![PathSegment::new("/", SegmentKind::Root)]);
    }

    #[test]
    fn test_literal_segments() {
        let (segments, valid) = segment("/ping/pong/pang");
        assert!(valid);
        assert_eq!(
            segments,
            vec![
                PathSegment::new("/", SegmentKind::Root),
                PathSegment::new("ping", SegmentKind::Normal),
                PathSegment::new("pong", SegmentKind::Normal),
                PathSegment::new("pang", SegmentKind::Normal),
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        for path in [
            "/",
            "/ping",
            "/ping/pong/pang",
            "/users/",
            "/a//b",
            "/user/:name/:provider",
            "/files/*rest",
            "//",
        ] {
            let (segments, _) = segment(path);
            assert_eq!(rejoin(&segments), path, "round trip failed for {path}");
        }
    }

    #[test]
    fn test_kinds() {
        let (segments, valid) = segment("/a/:id/*rest");
        assert!(valid);
        assert_eq!(
            kinds(&segments),
            vec![
                SegmentKind::Root,
                SegmentKind::Normal,
                SegmentKind::Param,
                SegmentKind::CatchAll,
            ]
        );
        // wildcard values keep their marker
        assert_eq!(segments[2].value, ":id");
        assert_eq!(segments[2].wildcard_name(), "id");
        assert_eq!(segments[3].value, "*rest");
        assert_eq!(segments[3].wildcard_name(), "rest");
    }

    #[test]
    fn test_second_marker_is_invalid() {
        let (_, valid) = segment("/a/:id:extra");
        assert!(!valid);

        let (_, valid) = segment("/a/:id*extra");
        assert!(!valid);

        let (_, valid) = segment("/a/*x*y");
        assert!(!valid);
    }

    #[test]
    fn test_invalid_parse_does_not_short_circuit() {
        let (segments, valid) = segment("/a/:id:extra/b");
        assert!(!valid);
        // the full sequence is still produced for diagnostics
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[3].value, "b");
    }

    #[test]
    fn test_trailing_separator() {
        let (segments, valid) = segment("/users/");
        assert!(valid);
        assert_eq!(
            segments,
            vec![
                PathSegment::new("/", SegmentKind::Root),
                PathSegment::new("users", SegmentKind::Normal),
                PathSegment::new("", SegmentKind::Normal),
            ]
        );
    }

    #[test]
    fn test_empty_inner_segments() {
        let (segments, valid) = segment("/a//b");
        assert!(valid);
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[2].value, "");
    }
}
