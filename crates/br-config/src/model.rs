//! Configuration model and value clamping.
//!
//! Raw on-disk values are signed and unbounded; [`RawRecorderConfig::clamped`]
//! is the only path from raw to effective values, so out-of-range input can
//! never reach the engine.

use serde::{Deserialize, Serialize};

/// Default sampling period.
pub const DEFAULT_INTERVAL_MILLIS: u64 = 900;

/// Default number of buffered records that triggers a flush.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Largest accepted batch size; larger values clamp down to this.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default age a non-empty buffer may reach before it is flushed anyway.
pub const DEFAULT_FLUSH_AFTER_MILLIS: u64 = 30_000;

/// Lower clamp bound for the flush deadline.
pub const MIN_FLUSH_AFTER_MILLIS: u64 = 100;

/// Upper clamp bound for the flush deadline.
pub const MAX_FLUSH_AFTER_MILLIS: u64 = 60_000;

/// Effective recorder configuration. Always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Sampling period in milliseconds. Zero means back-to-back ticks.
    pub interval_millis: u64,
    /// Buffered-record count that makes the buffer flush-eligible.
    /// Zero disables batching: every record is flushed as it arrives.
    pub batch_size: usize,
    /// Maximum age of a non-empty buffer before it is flushed regardless
    /// of `batch_size`, bounding data loss on power cut.
    pub flush_after_millis: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            interval_millis: DEFAULT_INTERVAL_MILLIS,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_after_millis: DEFAULT_FLUSH_AFTER_MILLIS,
        }
    }
}

/// On-disk form of the configuration: every key optional, values unclamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecorderConfig {
    #[serde(default = "default_interval_millis")]
    pub interval_millis: i64,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_flush_after_millis")]
    pub flush_after_millis: i64,
}

fn default_interval_millis() -> i64 {
    DEFAULT_INTERVAL_MILLIS as i64
}

fn default_batch_size() -> i64 {
    DEFAULT_BATCH_SIZE as i64
}

fn default_flush_after_millis() -> i64 {
    DEFAULT_FLUSH_AFTER_MILLIS as i64
}

impl Default for RawRecorderConfig {
    fn default() -> Self {
        RawRecorderConfig {
            interval_millis: default_interval_millis(),
            batch_size: default_batch_size(),
            flush_after_millis: default_flush_after_millis(),
        }
    }
}

impl RawRecorderConfig {
    /// Clamp raw values into their supported ranges.
    ///
    /// Negative intervals clamp to 0, batch sizes to `0..=1000`, flush
    /// deadlines to `100..=60000` ms. Clamping is silent: a slightly wrong
    /// config should degrade, not stop recording.
    pub fn clamped(&self) -> RecorderConfig {
        RecorderConfig {
            interval_millis: self.interval_millis.max(0) as u64,
            batch_size: self.batch_size.clamp(0, MAX_BATCH_SIZE as i64) as usize,
            flush_after_millis: self
                .flush_after_millis
                .clamp(MIN_FLUSH_AFTER_MILLIS as i64, MAX_FLUSH_AFTER_MILLIS as i64)
                as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RecorderConfig::default();
        assert_eq!(config.interval_millis, 900);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.flush_after_millis, 30_000);
    }

    #[test]
    fn clamps_oversized_batch_to_maximum() {
        let raw = RawRecorderConfig {
            batch_size: 5000,
            ..RawRecorderConfig::default()
        };
        assert_eq!(raw.clamped().batch_size, 1000);
    }

    #[test]
    fn clamps_negative_values_to_floor() {
        let raw = RawRecorderConfig {
            interval_millis: -100,
            batch_size: -5,
            flush_after_millis: 10,
        };
        let config = raw.clamped();
        assert_eq!(config.interval_millis, 0);
        assert_eq!(config.batch_size, 0);
        assert_eq!(config.flush_after_millis, 100);
    }

    #[test]
    fn clamps_flush_deadline_to_ceiling() {
        let raw = RawRecorderConfig {
            flush_after_millis: 600_000,
            ..RawRecorderConfig::default()
        };
        assert_eq!(raw.clamped().flush_after_millis, 60_000);
    }

    #[test]
    fn absent_keys_deserialize_to_defaults() {
        let raw: RawRecorderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(raw.clamped(), RecorderConfig::default());
    }

    #[test]
    fn partial_document_takes_defaults_for_missing_keys() {
        let raw: RawRecorderConfig = serde_json::from_str(r#"{"interval_millis": 250}"#).unwrap();
        let config = raw.clamped();
        assert_eq!(config.interval_millis, 250);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.flush_after_millis, DEFAULT_FLUSH_AFTER_MILLIS);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let raw: RawRecorderConfig =
            serde_json::from_str(r#"{"batch_size": 7, "future_knob": true}"#).unwrap();
        assert_eq!(raw.clamped().batch_size, 7);
    }
}
