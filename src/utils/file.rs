//! File utilities for document loading.

use std::fs;
use std::path::Path;

use crate::error::DocumentError;

/// Fail when a file is larger than `max_size` bytes. Returns the file size.
pub fn check_file_size(path: &Path, max_size: u64) -> Result<u64, DocumentError> {
    let metadata = fs::metadata(path).map_err(|source| DocumentError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.len() > max_size {
        return Err(DocumentError::TooLarge {
            size: metadata.len(),
            max: max_size,
        });
    }

    Ok(metadata.len())
}

/// Read a UTF-8 text file with a size limit.
pub fn read_file_content(path: &Path, max_size: u64) -> Result<String, DocumentError> {
    check_file_size(path, max_size)?;

    let bytes = fs::read(path).map_err(|source| DocumentError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|e| DocumentError::ExtractError {
        path: path.to_path_buf(),
        message: format!("not valid UTF-8: {}", e.utf8_error()),
    })
}

/// Check a path against glob exclude patterns.
pub fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    patterns.iter().any(|pattern| {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(&path_str))
            .unwrap_or(false)
    })
}

/// Human-readable size with one decimal, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0.0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024u64.pow(4)), "3.0 TB");
    }

    #[test]
    fn test_read_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        assert_eq!(read_file_content(&path, 100).unwrap(), "hello");
    }

    #[test]
    fn test_read_file_content_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello world").unwrap();
        let err = read_file_content(&path, 5).unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { size: 11, max: 5 }));
    }

    #[test]
    fn test_read_file_content_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = read_file_content(&path, 100).unwrap_err();
        assert!(matches!(err, DocumentError::ExtractError { .. }));
    }

    #[test]
    fn test_is_excluded() {
        let patterns = vec!["**/.git/**".to_string(), "**/~$*".to_string()];
        assert!(is_excluded(&PathBuf::from("/docs/.git/HEAD"), &patterns));
        assert!(is_excluded(&PathBuf::from("/docs/~$report.docx"), &patterns));
        assert!(!is_excluded(&PathBuf::from("/docs/report.docx"), &patterns));
    }
}
