//! Upload Validation
//!
//! Client-side checks run before a CSV file is sent to `/upload/`:
//! the name must end in `.csv` and the size must be within the limit.
//! Failures never reach the network.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const CSV_MIME: &str = "text/csv";

/// Reasons a file is rejected before upload
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{file_name}: only CSV files (.csv) are accepted")]
    NotCsv { file_name: String },

    #[error("{file_name}: file is {size} bytes, the limit is {max} bytes")]
    TooLarge { file_name: String, size: u64, max: u64 },

    #[error("{path:?} has no file name")]
    MissingName { path: PathBuf },

    #[error("Cannot read {path:?}: {error}")]
    Io { path: PathBuf, error: String },
}

/// A validated file, ready to be sent as the multipart `file` field
#[derive(Debug, Clone)]
pub struct CsvUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl CsvUpload {
    /// Validate name and size, then read the file
    ///
    /// The size is checked from metadata so oversized files are never read.
    pub fn from_path(path: &Path, max_bytes: u64) -> Result<Self, UploadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| UploadError::MissingName {
                path: path.to_path_buf(),
            })?;

        let io_err = |e: std::io::Error| UploadError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        let size = std::fs::metadata(path).map_err(io_err)?.len();
        validate(&file_name, size, max_bytes)?;

        let bytes = std::fs::read(path).map_err(io_err)?;
        Ok(Self { file_name, bytes })
    }

    /// Validate an in-memory file
    pub fn from_bytes(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: u64,
    ) -> Result<Self, UploadError> {
        let file_name = file_name.into();
        validate(&file_name, bytes.len() as u64, max_bytes)?;
        Ok(Self { file_name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check a candidate file by name and size
pub fn validate(file_name: &str, size: u64, max_bytes: u64) -> Result<(), UploadError> {
    if !is_csv_name(file_name) {
        return Err(UploadError::NotCsv {
            file_name: file_name.to_string(),
        });
    }

    if size > max_bytes {
        return Err(UploadError::TooLarge {
            file_name: file_name.to_string(),
            size,
            max: max_bytes,
        });
    }

    Ok(())
}

fn is_csv_name(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rejects_non_csv() {
        let err = validate("data.txt", 10, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(err, UploadError::NotCsv { .. }));
        assert!(validate("csv", 10, DEFAULT_MAX_UPLOAD_BYTES).is_err());
        assert!(validate("data.csv.txt", 10, DEFAULT_MAX_UPLOAD_BYTES).is_err());
    }

    #[test]
    fn test_accepts_csv_any_case() {
        assert!(validate("data.csv", 10, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert!(validate("VENTAS.CSV", 10, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        assert!(validate("data.csv", DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_BYTES).is_ok());

        let err = validate("data.csv", DEFAULT_MAX_UPLOAD_BYTES + 1, DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size, .. } if size == DEFAULT_MAX_UPLOAD_BYTES + 1));
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "date,product,sales\n2024-01-01,Laptop,1200\n").unwrap();

        let upload = CsvUpload::from_path(&path, DEFAULT_MAX_UPLOAD_BYTES).unwrap();
        assert_eq!(upload.file_name, "data.csv");
        assert!(upload.size() > 0);

        assert!(matches!(
            CsvUpload::from_path(&path, 8),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_from_path_rejections() {
        let err = CsvUpload::from_path(Path::new("/nonexistent/data.txt"), 100).unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));

        let dir = tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            CsvUpload::from_path(&path, 100),
            Err(UploadError::NotCsv { .. })
        ));
    }
}
