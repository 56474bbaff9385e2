//! Battery recorder configuration.
//!
//! The recorder reads a small flat JSON document, clamps every value into
//! its supported range, and applies the result wholesale: absent keys take
//! built-in defaults, never previously applied values. Loading is hidden
//! behind [`ConfigProvider`] so the engine can re-read the source on every
//! reconfigure command without caring where it lives.

pub mod model;
pub mod provider;
pub mod resolve;

pub use model::{
    RawRecorderConfig, RecorderConfig, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_AFTER_MILLIS,
    DEFAULT_INTERVAL_MILLIS, MAX_BATCH_SIZE, MAX_FLUSH_AFTER_MILLIS, MIN_FLUSH_AFTER_MILLIS,
};
pub use provider::{ConfigError, ConfigProvider, DefaultConfigProvider, FileConfigProvider};
pub use resolve::{resolve_config_path, ConfigSource, ResolvedConfig};
