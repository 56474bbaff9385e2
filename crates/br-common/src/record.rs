//! Sampled battery telemetry records and their on-disk line format.
//!
//! A record is one instantaneous reading: current, voltage, capacity, the
//! capture timestamp, and the foreground application at that moment. The
//! serialized form is a stable comma-joined line consumed by downstream
//! analysis tooling, so it must not change shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal written in place of the package field when no foreground
/// application is known.
pub const NULL_PACKAGE: &str = "null";

/// Sign of an instantaneous current reading.
///
/// Zero counts as positive: an idle device on mains draws ~0 and belongs
/// with the charging run, not in a segment of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Classify a raw current value.
    pub fn from_current(current: i64) -> Self {
        if current >= 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }

    /// Single-character form used in segment file names.
    pub fn suffix(self) -> char {
        match self {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
        }
    }

    /// Inverse of [`Polarity::suffix`].
    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            '+' => Some(Polarity::Positive),
            '-' => Some(Polarity::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// One sampled battery data point.
///
/// Units for `current` and `voltage` are whatever the telemetry source
/// reports (sysfs reports microamps/microvolts); the recorder never
/// interprets magnitudes, only the sign of `current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Wall-clock capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Instantaneous current; >= 0 means charging, < 0 discharging.
    pub current: i64,
    /// Instantaneous voltage.
    pub voltage: i64,
    /// Foreground application at capture time, if known.
    pub foreground_package: Option<String>,
    /// Battery capacity percentage, 0..=100, passed through unvalidated.
    pub capacity_percent: i32,
}

impl Record {
    /// Sign of this record's current.
    pub fn polarity(&self) -> Polarity {
        Polarity::from_current(self.current)
    }

    /// Parse one serialized line (with or without a trailing newline).
    ///
    /// Readers skip lines this returns `None` for (a truncated tail after a
    /// crash, for example) instead of aborting the whole file. The literal
    /// package `null` parses back to `None`.
    pub fn parse_line(line: &str) -> Option<Record> {
        let mut parts = line.trim_end_matches(['\r', '\n']).split(',');
        let timestamp_ms = parts.next()?.parse().ok()?;
        let current = parts.next()?.parse().ok()?;
        let voltage = parts.next()?.parse().ok()?;
        let package = parts.next()?;
        let capacity_percent = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let foreground_package = if package == NULL_PACKAGE {
            None
        } else {
            Some(package.to_string())
        };
        Some(Record {
            timestamp_ms,
            current,
            voltage,
            foreground_package,
            capacity_percent,
        })
    }
}

/// The canonical line form, without a trailing newline.
///
/// Fields are not escaped; a comma inside `foreground_package` would shift
/// the columns. Platform package identifiers cannot contain commas, so the
/// format accepts that limitation rather than paying for quoting.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.timestamp_ms,
            self.current,
            self.voltage,
            self.foreground_package.as_deref().unwrap_or(NULL_PACKAGE),
            self.capacity_percent
        )
    }
}
