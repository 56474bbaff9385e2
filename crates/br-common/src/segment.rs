//! Segment file naming.
//!
//! A segment file holds a consecutive run of records sharing one current
//! polarity. Its name encodes the first record's capture timestamp and that
//! polarity: `{start_timestamp_ms}{+|-}.txt`, e.g. `1700000000123+.txt`.
//! Two segments may start on the same millisecond only with opposite signs,
//! so the sign character keeps their names distinct.

use crate::record::Polarity;

/// Extension shared by all segment files.
pub const SEGMENT_EXTENSION: &str = ".txt";

/// Build the file name for a segment starting at `start_ms`.
pub fn segment_file_name(start_ms: i64, polarity: Polarity) -> String {
    format!("{}{}{}", start_ms, polarity.suffix(), SEGMENT_EXTENSION)
}

/// Parse a segment file name back into its start timestamp and polarity.
///
/// Strict: digits, exactly one sign character, then `.txt`. Anything else
/// returns `None`, which lets directory scans skip foreign files instead of
/// misreading them.
pub fn parse_segment_file_name(name: &str) -> Option<(i64, Polarity)> {
    let stem = name.strip_suffix(SEGMENT_EXTENSION)?;
    let sign = stem.chars().next_back()?;
    let polarity = Polarity::from_suffix(sign)?;
    let digits = &stem[..stem.len() - sign.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let start_ms = digits.parse().ok()?;
    Some((start_ms, polarity))
}
