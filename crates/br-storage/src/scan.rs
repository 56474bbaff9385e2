//! On-disk segment enumeration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use br_common::record::Polarity;
use br_common::segment::parse_segment_file_name;

use crate::writer::StorageError;

/// One segment file found on disk.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentFile {
    pub file_name: String,
    pub path: PathBuf,
    pub start_timestamp_ms: i64,
    pub polarity: Polarity,
    pub size_bytes: u64,
}

impl SegmentFile {
    /// Segment start as a UTC timestamp, when representable.
    pub fn start_time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_timestamp_ms)
    }
}

/// List segment files under `dir`, ascending by start timestamp (polarity
/// breaks the rare same-millisecond tie).
///
/// Entries whose names do not parse as segment names are skipped rather
/// than reported, so stray files cannot break a listing. A missing
/// directory yields an empty list: the recorder may simply not have written
/// anything yet.
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentFile>, StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::Unavailable {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut segments = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StorageError::Unavailable {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name();
        let file_name = match file_name.to_str() {
            Some(name) => name,
            None => continue,
        };
        let (start_timestamp_ms, polarity) = match parse_segment_file_name(file_name) {
            Some(parsed) => parsed,
            None => continue,
        };
        let metadata = entry.metadata().map_err(|source| StorageError::Unavailable {
            path: entry.path(),
            source,
        })?;
        if !metadata.is_file() {
            continue;
        }
        segments.push(SegmentFile {
            file_name: file_name.to_string(),
            path: entry.path(),
            start_timestamp_ms,
            polarity,
            size_bytes: metadata.len(),
        });
    }

    segments.sort_by_key(|segment| (segment.start_timestamp_ms, segment.polarity.suffix()));
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lists_segments_sorted_by_start_timestamp() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("300-.txt"), "300,-2,4,null,50\n").unwrap();
        fs::write(dir.path().join("100+.txt"), "100,5,4,null,50\n").unwrap();
        fs::write(dir.path().join("500+.txt"), "500,4,4,null,50\n").unwrap();

        let segments = list_segments(dir.path()).unwrap();
        let names: Vec<&str> = segments.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, vec!["100+.txt", "300-.txt", "500+.txt"]);
        assert_eq!(segments[0].polarity, Polarity::Positive);
        assert_eq!(segments[1].start_timestamp_ms, 300);
    }

    #[test]
    fn skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("100+.txt"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "hello").unwrap();
        fs::write(dir.path().join("123.txt"), "no sign").unwrap();
        fs::create_dir(dir.path().join("456+.txt")).unwrap(); // dir, not file

        let segments = list_segments(dir.path()).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].file_name, "100+.txt");
    }

    #[test]
    fn missing_directory_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let segments = list_segments(&dir.path().join("never-written")).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn reports_file_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("100+.txt"), "100,5,4,null,50\n").unwrap();

        let segments = list_segments(dir.path()).unwrap();
        assert_eq!(segments[0].size_bytes, 16);
    }

    #[test]
    fn start_time_utc_converts_epoch_millis() {
        let segment = SegmentFile {
            file_name: "0+.txt".to_string(),
            path: PathBuf::from("0+.txt"),
            start_timestamp_ms: 0,
            polarity: Polarity::Positive,
            size_bytes: 0,
        };
        assert_eq!(
            segment.start_time_utc().unwrap().to_rfc3339(),
            "1970-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn segment_file_serializes_to_json() {
        let segment = SegmentFile {
            file_name: "100-.txt".to_string(),
            path: PathBuf::from("/data/100-.txt"),
            start_timestamp_ms: 100,
            polarity: Polarity::Negative,
            size_bytes: 16,
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["polarity"], "negative");
        assert_eq!(json["start_timestamp_ms"], 100);
    }
}
