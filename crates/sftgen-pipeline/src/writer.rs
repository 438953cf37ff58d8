//! Dataset writer: the result set as one pretty-printed JSON array

use crate::error::PipelineError;
use chrono::Local;
use sftgen_domain::{AnnotationRecord, ResultSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a run's dataset goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Overwrite this exact file
    File(PathBuf),
    /// Create `dataset_YYYYMMDD_HHMMSS.json` inside this directory
    Directory(PathBuf),
}

impl OutputTarget {
    /// Resolve to a concrete file path; call once per run
    pub fn resolve(&self) -> PathBuf {
        match self {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Directory(dir) => timestamped_path(dir),
        }
    }
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Directory(PathBuf::from("text_dataset"))
    }
}

/// `dir/dataset_YYYYMMDD_HHMMSS.json` for the current local time
pub fn timestamped_path(dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("dataset_{}.json", timestamp))
}

/// Serializes records as a JSON array with full-file overwrite semantics
#[derive(Debug, Clone, Default)]
pub struct DatasetWriter;

impl DatasetWriter {
    /// Create a writer
    pub fn new() -> Self {
        Self
    }

    /// Write `records` to `path`, replacing any previous content.
    ///
    /// The JSON goes to a sibling temporary file first and is then renamed
    /// into place, so `path` always holds a complete array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, directory creation, the write or
    /// the rename fails.
    pub fn write(&self, records: &[AnnotationRecord], path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(records)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| PipelineError::Config(format!("Not a file path: {}", path.display())))?;
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;

        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    /// Read a dataset file back
    pub fn read(&self, path: &Path) -> Result<ResultSet, PipelineError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_pretty_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let records = vec![AnnotationRecord::new("标题", "原文")];

        DatasetWriter::new().write(&records, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"instruction\": \"标题\""));
        assert!(contents.contains("\n  {"));
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let writer = DatasetWriter::new();

        writer
            .write(&[AnnotationRecord::new("a", "1"), AnnotationRecord::new("b", "2")], &path)
            .unwrap();
        writer.write(&[AnnotationRecord::new("c", "3")], &path).unwrap();

        let records = writer.read(&path).unwrap();
        assert_eq!(records, vec![AnnotationRecord::new("c", "3")]);
    }

    #[test]
    fn test_write_creates_parent_dirs_and_no_tmp_left() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.json");

        DatasetWriter::new().write(&[], &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_timestamped_path_shape() {
        let path = timestamped_path(Path::new("out"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("dataset_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "dataset_20240101_120000.json".len());
        assert_eq!(path.parent().unwrap(), Path::new("out"));
    }

    #[test]
    fn test_output_target_file_resolves_to_itself() {
        let target = OutputTarget::File(PathBuf::from("a/b.json"));
        assert_eq!(target.resolve(), PathBuf::from("a/b.json"));
    }
}
