//! Fixed-width rendering of version timestamps.
//!
//! Backends that order versions by a rendered timestamp (filenames in the
//! file store, the `stamp` column in the SQLite store) share this format.
//! It is RFC 3339 with exactly nine fractional digits and a literal `Z`,
//! chosen so that lexicographic order of the rendered strings equals
//! chronological order of the instants.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// `2006-01-02T15:04:05.000000000Z`, with trailing zeroes preserved.
pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Error from [`parse`]: the input is not a timestamp, or not in the
/// canonical fixed-width rendering.
#[derive(Debug, Error)]
pub enum ParseStampError {
    #[error(transparent)]
    Invalid(#[from] chrono::ParseError),
    #[error("non-canonical stamp {0:?}")]
    NonCanonical(String),
}

/// Renders a timestamp in the fixed-width version format.
pub fn render(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(STAMP_FORMAT).to_string()
}

/// Parses a rendered version timestamp back into a UTC instant. Only the
/// canonical rendering is accepted: chrono's `%.9f` tolerates missing or
/// shorter fractional parts, but a short stamp would break the
/// lexicographic-equals-chronological property the backends sort by.
pub fn parse(rendered: &str) -> Result<DateTime<Utc>, ParseStampError> {
    let parsed = NaiveDateTime::parse_from_str(rendered, STAMP_FORMAT)?.and_utc();
    if render(&parsed) != rendered {
        return Err(ParseStampError::NonCanonical(rendered.to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn render_is_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2015, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(render(&ts), "2015-03-14T09:26:53.000000000Z");
        assert_eq!(render(&ts).len(), 30);

        let ts = ts + chrono::Duration::nanoseconds(500);
        assert_eq!(render(&ts), "2015-03-14T09:26:53.000000500Z");
    }

    #[test]
    fn parse_inverts_render() {
        let ts = Utc::now();
        assert_eq!(parse(&render(&ts)).unwrap(), ts);
    }

    #[test]
    fn lexicographic_order_is_chronological() {
        let base = Utc.with_ymd_and_hms(2015, 12, 31, 23, 59, 59).unwrap();
        let stamps = [
            base,
            base + chrono::Duration::nanoseconds(1),
            base + chrono::Duration::milliseconds(10),
            base + chrono::Duration::seconds(1), // rolls over into the new year
            base + chrono::Duration::days(40),
        ];
        let rendered: Vec<String> = stamps.iter().map(render).collect();
        let mut sorted = rendered.clone();
        sorted.sort();
        assert_eq!(rendered, sorted);
    }

    #[test]
    fn malformed_stamps_are_rejected() {
        assert!(parse("not a stamp").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn non_canonical_stamps_are_rejected() {
        // chrono parses a missing fractional part; the canonical check
        // must still refuse it.
        assert!(matches!(
            parse("2015-03-14T09:26:53Z"),
            Err(ParseStampError::NonCanonical(_))
        ));
        assert!(parse("2015-03-14T09:26:53.5Z").is_err());
    }
}
