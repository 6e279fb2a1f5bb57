//! File validation utilities run when a session opens a file.

use crate::error::{JsonlError, Result};
use std::fs::File;
use std::path::Path;

/// Validate that a file path is accessible and suitable for browsing
///
/// # Validations Performed
/// - Path exists and is a regular file (not a directory)
/// - File is readable by the current process
///
/// Empty files are accepted: they browse as a single empty page.
pub fn validate_file_path(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => JsonlError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => JsonlError::file_error(
            format!("Failed to read file metadata: {}", path.display()),
            e,
        ),
    })?;

    if !metadata.is_file() {
        return Err(JsonlError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    // Opening verifies read permission; the handle is dropped immediately
    File::open(path).map_err(|e| {
        JsonlError::file_error(
            format!("Cannot open file for reading: {}", path.display()),
            e,
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content)
            .expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    #[test]
    fn test_validate_valid_file() {
        let test_file = create_test_file(b"{\"a\":1}\n{\"a\":2}\n");
        assert!(validate_file_path(test_file.path()).is_ok());
    }

    #[test]
    fn test_validate_nonexistent_file() {
        let missing = Path::new("/this/file/does/not/exist.jsonl");
        match validate_file_path(missing) {
            Err(JsonlError::FileNotFound { path }) => assert_eq!(path, missing),
            other => panic!("Expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_empty_file_is_accepted() {
        let empty_file = create_test_file(&[]);
        assert!(validate_file_path(empty_file.path()).is_ok());
    }

    #[test]
    fn test_validate_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(matches!(
            validate_file_path(temp_dir.path()),
            Err(JsonlError::NotAFile { .. })
        ));
    }
}
