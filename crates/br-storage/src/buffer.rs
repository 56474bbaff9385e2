//! In-memory batch accumulation with a configurable flush threshold.

use br_common::record::Record;

use crate::writer::{SegmentedWriter, StorageError};

/// Accumulates records in insertion order until a flush hands them to the
/// writer.
///
/// The buffer performs no I/O of its own and owns no policy beyond the
/// size threshold; timing-based flushing lives with the caller, which is
/// the only place that has a clock.
pub struct BatchBuffer {
    records: Vec<Record>,
    batch_size: usize,
}

impl BatchBuffer {
    /// Create a buffer that becomes flush-eligible at `batch_size` records.
    /// A size of zero disables batching: any buffered record makes the
    /// buffer flush-eligible immediately.
    pub fn new(batch_size: usize) -> Self {
        BatchBuffer {
            records: Vec::new(),
            batch_size,
        }
    }

    /// Append a record. Never triggers I/O.
    pub fn insert(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Whether the buffer has reached its flush threshold.
    pub fn should_flush(&self) -> bool {
        !self.records.is_empty() && self.records.len() >= self.batch_size
    }

    /// Hand all buffered records to `writer` in insertion order.
    ///
    /// The buffer is cleared only when the writer call returned without
    /// error; on failure every record stays buffered so a later attempt can
    /// retry (at-least-once: a partial write plus retry may duplicate
    /// lines, never lose them). Flushing an empty buffer succeeds without
    /// touching the writer at all. Returns the number of records flushed.
    pub fn flush(&mut self, writer: &mut SegmentedWriter) -> Result<usize, StorageError> {
        if self.records.is_empty() {
            return Ok(0);
        }
        writer.write(&self.records)?;
        let flushed = self.records.len();
        self.records.clear();
        Ok(flushed)
    }

    /// Change the flush threshold.
    ///
    /// Takes effect at the next [`BatchBuffer::should_flush`] check; a
    /// buffer already past the new threshold is not flushed here.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    /// Current flush threshold.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
