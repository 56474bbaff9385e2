//! Battery recorder common types.
//!
//! Foundational types shared across the br-* crates:
//! - Sampled telemetry records and their on-disk line format
//! - Current polarity (charging vs discharging)
//! - Segment file naming

pub mod record;
pub mod segment;

pub use record::{Polarity, Record};
pub use segment::{parse_segment_file_name, segment_file_name, SEGMENT_EXTENSION};
