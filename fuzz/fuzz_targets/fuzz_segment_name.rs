//! Fuzz target for segment file name parsing.
//!
//! Tests that `parse_segment_file_name` handles arbitrary names without
//! panicking, and that whatever it accepts round-trips through the
//! canonical renderer.

#![no_main]

use br_common::segment::{parse_segment_file_name, segment_file_name};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // The parser should never panic, only return None for malformed names
    if let Some((start_ms, polarity)) = parse_segment_file_name(data) {
        let canonical = segment_file_name(start_ms, polarity);
        assert_eq!(
            parse_segment_file_name(&canonical),
            Some((start_ms, polarity))
        );
    }
});
