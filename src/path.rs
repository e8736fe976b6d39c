//! Path normalization and conversion between the string and segment-list
//! forms of a resource path.
//!
//! Canonical string form: always starts with `/`, never has a trailing `/`
//! except at the root, never contains a run of more than one `/`. Canonical
//! segment form: an ordered list of non-empty names; the empty list is the
//! root.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// A resolved, decoded path: an ordered sequence of non-empty segment names.
/// The root is the empty vector.
pub type Segments = Vec<String>;

/// Characters percent-encoded when a single segment is re-emitted into a
/// URL. `/` is always encoded since it is the path delimiter, never part of
/// a segment's own content once split.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

/// Canonicalize a string path: ensure a leading `/`, collapse repeated `/`,
/// and drop any trailing `/` other than at the root.
pub fn normalize(raw: &str) -> String {
    to_string(&split(raw))
}

/// Split an already-decoded path string into its segments, discarding empty
/// components produced by leading/trailing/doubled slashes.
pub fn split(raw: &str) -> Segments {
    raw.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Rebuild the canonical string form from a segment list.
pub fn to_string(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(seg);
    }
    out
}

/// Decode a raw (percent-encoded) request path into segments. This is the
/// single point where percent-decoding happens; nothing past this boundary
/// ever sees an encoded byte. Splitting happens on the *raw* `/` first, so
/// an encoded delimiter (`%2F`) inside a segment never causes a spurious
/// split — it is only decoded once the segment boundaries are already fixed.
pub fn decode_segments(raw_path: &str) -> Segments {
    raw_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8_lossy()
                .into_owned()
        })
        .collect()
}

/// Percent-encode a single segment for embedding in an href or link.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string()
}

/// Build a URL-safe href from segments, percent-encoding each one
/// individually and joining with `/`. Appends a trailing `/` when
/// `is_dir` is true.
pub fn to_href(segments: &[String], is_dir: bool) -> String {
    let mut href = String::from("/");
    href.push_str(
        &segments
            .iter()
            .map(|s| encode_segment(s))
            .collect::<Vec<_>>()
            .join("/"),
    );
    if is_dir && !href.ends_with('/') {
        href.push('/');
    }
    href
}

/// Append one segment to a path, returning a new segment list.
pub fn join(parent: &[String], name: &str) -> Segments {
    let mut out = parent.to_vec();
    out.push(name.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_slashes_and_trailing_slash() {
        assert_eq!(normalize("a//b/"), "/a/b");
        assert_eq!(normalize("/a/b"), "/a/b");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
    }

    #[test]
    fn split_discards_empty_segments() {
        assert_eq!(split("/a/b/"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(split("/"), Vec::<String>::new());
        assert_eq!(split(""), Vec::<String>::new());
    }

    #[test]
    fn roundtrip_is_identity_on_canonical_input() {
        for raw in ["/", "/a", "/a/b", "/a/b/c"] {
            let segs = split(raw);
            assert_eq!(to_string(&segs), raw);
        }
    }

    #[test]
    fn decode_segments_handles_percent_encoding() {
        assert_eq!(
            decode_segments("/hello%20world/a%2Fb"),
            vec!["hello world".to_string(), "a/b".to_string()]
        );
    }

    #[test]
    fn decode_segments_splits_on_raw_slash_before_decoding() {
        // `%2F` inside a segment must not be mistaken for a path delimiter:
        // splitting has to happen before percent-decoding, not after.
        assert_eq!(
            decode_segments("/a%2Fb/c"),
            vec!["a/b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn to_href_encodes_each_segment_and_marks_directories() {
        let segs = vec!["a b".to_string(), "c".to_string()];
        assert_eq!(to_href(&segs, false), "/a%20b/c");
        assert_eq!(to_href(&segs, true), "/a%20b/c/");
        assert_eq!(to_href(&[], true), "/");
    }
}
