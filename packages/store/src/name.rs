//! Validation and segment conversion for document Names.
//!
//! A Name is a nonempty sequence of segments. Each segment consists of a
//! slash, followed by at least one non-slash printable ASCII character
//! (any character in the range `\x20-\x2E` or `\x30-\x7E`). A segment may
//! not be `.` or `..`. The last segment is the document's title.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_GRAMMAR: Regex = Regex::new(r"^(?:/[\x20-\x2E\x30-\x7E]+)+$").unwrap();
    static ref DOT_SEGMENTS: Regex = Regex::new(r"/\.\.?(/|$)").unwrap();
}

/// Determines if a given string is a valid document Name.
pub fn validate(name: &str) -> bool {
    NAME_GRAMMAR.is_match(name) && !DOT_SEGMENTS.is_match(name)
}

/// Splits a Name into its ordered segments, with the leading slashes
/// stripped. Returns an empty vector if the Name is invalid (including the
/// empty string).
pub fn to_segments(name: &str) -> Vec<&str> {
    if !validate(name) {
        return Vec::new();
    }
    name.split('/').skip(1).collect()
}

/// Assembles a Name from a list of segments. Returns `None` if the list is
/// empty or any segment is not well formed (empty, containing `/`, or
/// containing a character outside the printable ASCII segment set).
///
/// This checks segment well-formedness only. It does not reject `.` or
/// `..` segments; use [`validate`] on the result where that matters.
pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }

    let mut name = String::new();
    for segment in segments {
        let segment = segment.as_ref();
        if !segment_well_formed(segment) {
            return None;
        }
        name.push('/');
        name.push_str(segment);
    }
    Some(name)
}

fn segment_well_formed(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| matches!(b, 0x20..=0x2E | 0x30..=0x7E))
}

#[cfg(test)]
mod tests {
    use super::*;

    // (name, segments); an empty segment list marks an invalid name
    fn name_table() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("/Foo/Bar/Baz", vec!["Foo", "Bar", "Baz"]),
            ("/base/o(n)/10%/val Foo", vec!["base", "o(n)", "10%", "val Foo"]),
            (
                "/<>,.?;:'\"[]{}/\\|=+-_`~/!@#$%^&*()",
                vec!["<>,.?;:'\"[]{}", "\\|=+-_`~", "!@#$%^&*()"],
            ),
            ("/", vec![]),
            ("Foo/Bar", vec![]),
            ("/Foo/Bar/", vec![]),
            ("", vec![]),
            ("/Foo//Bar", vec![]),
            ("/世/界/Bar", vec![]),
            ("/./Bar", vec![]),
            ("/Bar/.", vec![]),
            ("/Bar/..", vec![]),
            ("/../Bar", vec![]),
            ("/.../Bar", vec!["...", "Bar"]),
        ]
    }

    #[test]
    fn validate_matches_grammar() {
        for (name, segments) in name_table() {
            assert_eq!(validate(name), !segments.is_empty(), "name: {:?}", name);
        }
    }

    #[test]
    fn to_segments_splits_valid_names() {
        for (name, segments) in name_table() {
            assert_eq!(to_segments(name), segments, "name: {:?}", name);
        }
    }

    #[test]
    fn from_segments_assembles_names() {
        let table: Vec<(Vec<&str>, Option<&str>)> = vec![
            (vec!["Foo", "Bar", "Baz"], Some("/Foo/Bar/Baz")),
            (
                vec!["base", "o(n)", "10%", "val Foo"],
                Some("/base/o(n)/10%/val Foo"),
            ),
            (vec![], None),
            (vec!["Bar", ""], None),
            (vec!["世", "界", "Bar"], None),
            (vec!["either/or", "one/theother", "foo"], None),
            (vec!["...", "foo"], Some("/.../foo")),
        ];
        for (segments, name) in table {
            assert_eq!(
                from_segments(&segments).as_deref(),
                name,
                "segments: {:?}",
                segments
            );
        }
    }

    #[test]
    fn from_segments_keeps_dot_segments() {
        // Well-formedness only: dot segments pass through here and are
        // caught by validate instead.
        assert_eq!(from_segments(&[".", "foo"]).as_deref(), Some("/./foo"));
        assert_eq!(from_segments(&["..", "foo"]).as_deref(), Some("/../foo"));
        assert!(!validate("/./foo"));
        assert!(!validate("/../foo"));
    }

    #[test]
    fn round_trip_legal_segments() {
        for segments in [
            vec!["Foo"],
            vec!["Foo", "Bar"],
            vec!["a b", "c%d", "_"],
            vec!["..."],
        ] {
            let name = from_segments(&segments).unwrap();
            assert_eq!(to_segments(&name), segments);
        }
    }

    #[test]
    fn validate_is_total_over_arbitrary_strings() {
        for s in ["", "/", "//", "a", "/a", "/a/", "\u{0}", "/\u{7f}", "/\t"] {
            // to_segments is nonempty iff validate is true
            assert_eq!(!to_segments(s).is_empty(), validate(s), "input: {:?}", s);
        }
    }
}
