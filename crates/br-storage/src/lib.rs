//! Battery recorder storage engine.
//!
//! Provides the on-disk half of the recorder:
//! - [`BatchBuffer`]: in-memory accumulation with a configurable flush threshold
//! - [`SegmentedWriter`]: append-only segment files partitioned by current sign
//! - [`list_segments`]: enumeration of what is already on disk
//!
//! The buffer never touches disk and the writer never buffers records, so
//! retry-after-failure semantics stay in one place each.

pub mod buffer;
pub mod ownership;
pub mod scan;
pub mod writer;

pub use buffer::BatchBuffer;
pub use ownership::{NoopOwnership, OwnershipHandler};
#[cfg(unix)]
pub use ownership::ChownOwnership;
pub use scan::{list_segments, SegmentFile};
pub use writer::{default_segment_dir, SegmentedWriter, StorageError};
