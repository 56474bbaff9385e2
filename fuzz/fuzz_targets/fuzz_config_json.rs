//! Fuzz target for recorder.json configuration parsing.
//!
//! Tests that config parsing and clamping handle arbitrary input without
//! panicking and that clamped values always land inside the documented
//! ranges.

#![no_main]

use br_config::{RawRecorderConfig, MAX_BATCH_SIZE, MAX_FLUSH_AFTER_MILLIS, MIN_FLUSH_AFTER_MILLIS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing should never panic, only return an error
    if let Ok(raw) = serde_json::from_slice::<RawRecorderConfig>(data) {
        let config = raw.clamped();
        assert!(config.batch_size <= MAX_BATCH_SIZE);
        assert!(config.flush_after_millis >= MIN_FLUSH_AFTER_MILLIS);
        assert!(config.flush_after_millis <= MAX_FLUSH_AFTER_MILLIS);
    }
});
