//! Fuzz target for record line parsing.
//!
//! Tests that `Record::parse_line` handles arbitrary input without
//! panicking, and that every accepted line survives a render/parse round
//! trip intact.

#![no_main]

use br_common::record::Record;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // The parser should never panic, only return None for malformed input
    if let Some(record) = Record::parse_line(data) {
        let rendered = record.to_string();
        let reparsed = Record::parse_line(&rendered).expect("rendered line must parse");
        assert_eq!(record, reparsed);
    }
});
