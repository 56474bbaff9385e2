//! Sign-segmented append-only writer for telemetry records.
//!
//! Records are written as text lines into segment files; a new segment
//! starts exactly when the sign of the current flips (charging vs
//! discharging), never for any other reason. Segment files are named after
//! their first record's timestamp plus the sign character, so the full
//! history reads back in order from the file names alone.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use br_common::record::{Polarity, Record};
use br_common::segment::segment_file_name;

use crate::ownership::OwnershipHandler;

/// Errors from storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage directory or a segment file could not be brought up.
    /// Fatal only to the affected write attempt; the next attempt retries
    /// directory and segment creation from scratch.
    #[error("storage unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An append or stream flush failed partway.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    /// The writer reached its terminal closed state; construct a new one
    /// to write again.
    #[error("writer is closed")]
    Closed,
}

/// The segment file currently accepting appends.
struct OpenSegment {
    polarity: Polarity,
    path: PathBuf,
    stream: std::io::BufWriter<File>,
}

/// Append-only writer that groups consecutive same-sign records into
/// segment files named `{start_timestamp_ms}{+|-}.txt`.
///
/// Construction performs no I/O: the directory is created lazily on the
/// first segment open and re-checked on every open thereafter, so a storage
/// outage at startup only costs the records written during it.
///
/// Segments are opened in append mode, so a rotation that lands on an
/// existing file name (the sign flipping back within one millisecond)
/// extends that file instead of truncating it. Records already on disk are
/// never rewritten.
pub struct SegmentedWriter {
    dir: PathBuf,
    ownership: Box<dyn OwnershipHandler>,
    segment: Option<OpenSegment>,
    closed: bool,
}

impl SegmentedWriter {
    /// Create a writer rooted at `dir`. No I/O happens here.
    pub fn new(dir: impl Into<PathBuf>, ownership: Box<dyn OwnershipHandler>) -> Self {
        SegmentedWriter {
            dir: dir.into(),
            ownership,
            segment: None,
            closed: false,
        }
    }

    /// The storage directory this writer appends under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the segment currently accepting appends, if any.
    pub fn open_segment_path(&self) -> Option<&Path> {
        self.segment.as_ref().map(|open| open.path.as_path())
    }

    /// Whether [`SegmentedWriter::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Ensure the storage directory exists.
    ///
    /// Idempotent. A non-directory squatting on the path surfaces as
    /// [`StorageError::Unavailable`] through `create_dir_all`.
    pub fn ensure_directory(&self) -> Result<(), StorageError> {
        if self.dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Unavailable {
            path: self.dir.clone(),
            source,
        })?;
        self.ownership.apply(&self.dir);
        Ok(())
    }

    /// Append `records` in order, rotating segments on sign change, then
    /// flush the stream to the operating system so the batch is durable.
    ///
    /// A failure partway leaves already appended lines in place; callers
    /// retain the batch and may retry, accepting at-least-once duplicates
    /// over silent loss.
    pub fn write(&mut self, records: &[Record]) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            let polarity = record.polarity();
            let needs_rotation = self
                .segment
                .as_ref()
                .map_or(true, |open| open.polarity != polarity);
            if needs_rotation {
                self.open_segment(record.timestamp_ms, polarity)?;
            }
            if let Some(open) = self.segment.as_mut() {
                writeln!(open.stream, "{}", record)?;
            }
        }

        self.flush_stream()
    }

    /// Flush the open segment's stream to the OS. No-op without one.
    pub fn flush_stream(&mut self) -> Result<(), StorageError> {
        if let Some(open) = self.segment.as_mut() {
            open.stream.flush()?;
        }
        Ok(())
    }

    /// Flush and close the open segment and refuse further writes.
    ///
    /// Idempotent: the first call decides the outcome, later calls succeed
    /// without touching anything. The closed state is terminal even when
    /// the final flush fails.
    pub fn close(&mut self) -> Result<(), StorageError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(mut open) = self.segment.take() {
            debug!(segment = %open.path.display(), "closing final segment");
            open.stream.flush()?;
        }
        Ok(())
    }

    /// Close the current segment (if any) and start a fresh one.
    fn open_segment(&mut self, start_ms: i64, polarity: Polarity) -> Result<(), StorageError> {
        if let Some(open) = self.segment.as_mut() {
            // A failure keeps the segment open; the caller retains the
            // batch and the retry flushes it again.
            open.stream.flush()?;
            debug!(segment = %open.path.display(), "closing segment on rotation");
        }
        self.segment = None;

        self.ensure_directory()?;
        let path = self.dir.join(segment_file_name(start_ms, polarity));
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| StorageError::Unavailable {
                path: path.clone(),
                source,
            })?;
        self.ownership.apply(&path);
        debug!(segment = %path.display(), "opened segment");

        self.segment = Some(OpenSegment {
            polarity,
            path,
            stream: std::io::BufWriter::new(file),
        });
        Ok(())
    }
}

impl Drop for SegmentedWriter {
    fn drop(&mut self) {
        // Best-effort flush on drop
        if !self.closed {
            let _ = self.close();
        }
    }
}

/// Default segment directory under the XDG local data dir.
pub fn default_segment_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("batrec")
        .join("segments")
}
