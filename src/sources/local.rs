//! Local file system document loader.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::DocumentError;
use crate::models::{Document, DocumentFormat, IndexingConfig};
use crate::utils::{has_meaningful_content, is_excluded};

/// A supported file that produced no document.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a directory scan produced.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
    pub unsupported_files: usize,
}

/// Loads PDF, text and DOCX files from a directory tree.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    /// Patterns to exclude
    exclude_patterns: Vec<String>,

    /// Maximum file size
    max_file_size: u64,
}

impl DocumentLoader {
    pub fn new(exclude_patterns: Vec<String>, max_file_size: u64) -> Self {
        Self {
            exclude_patterns,
            max_file_size,
        }
    }

    pub fn from_config(config: &IndexingConfig) -> Self {
        Self::new(config.exclude_patterns.clone(), config.max_file_size)
    }

    /// Collect supported files in sorted order. Returns the files and the
    /// number of files with unsupported extensions.
    pub fn collect_files(
        &self,
        root: &Path,
    ) -> Result<(Vec<(PathBuf, DocumentFormat)>, usize), DocumentError> {
        if !root.is_dir() {
            return Err(DocumentError::DirectoryNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let mut unsupported = 0;

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if !entry.file_type().is_file() || is_excluded(path, &self.exclude_patterns) {
                continue;
            }

            match DocumentFormat::from_path(path) {
                Some(format) => files.push((path.to_path_buf(), format)),
                None => {
                    tracing::debug!("Ignoring unsupported file: {}", path.display());
                    unsupported += 1;
                }
            }
        }

        Ok((files, unsupported))
    }

    /// Read one file into a document.
    pub fn load_file(&self, path: &Path, format: DocumentFormat) -> Result<Document, DocumentError> {
        let content = format.extract(path, self.max_file_size)?;
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Ok(Document::new(
            content,
            path.to_string_lossy().to_string(),
            format,
            size_bytes,
        ))
    }

    /// Load every supported document under `root`.
    ///
    /// Per-file failures are recorded in [`LoadOutcome::skipped`]; the scan
    /// only fails when the directory is missing or nothing usable was found.
    pub fn load_directory(&self, root: &Path) -> Result<LoadOutcome, DocumentError> {
        let (files, unsupported_files) = self.collect_files(root)?;

        let mut outcome = LoadOutcome {
            unsupported_files,
            ..Default::default()
        };

        for (path, format) in files {
            match self.load_file(&path, format) {
                Ok(doc) if has_meaningful_content(&doc.content) => {
                    tracing::debug!("Loaded {} ({} chars)", doc.source, doc.char_len());
                    outcome.documents.push(doc);
                }
                Ok(_) => {
                    tracing::warn!("Skipping {}: no text content", path.display());
                    outcome.skipped.push(SkippedFile {
                        path,
                        reason: "no text content".to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    outcome.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if outcome.documents.is_empty() {
            return Err(DocumentError::NoDocuments {
                path: root.to_path_buf(),
                skipped: outcome.skipped.len(),
            });
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn loader() -> DocumentLoader {
        DocumentLoader::from_config(&IndexingConfig::default())
    }

    #[test]
    fn test_load_directory_mixed_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.md"), "# first").unwrap();
        fs::write(dir.path().join("blank.txt"), "  \n\t").unwrap();
        fs::write(dir.path().join("photo.png"), "binary").unwrap();
        fs::write(dir.path().join("old.doc"), "binary").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.TXT"), "third").unwrap();

        let outcome = loader().load_directory(dir.path()).unwrap();

        let contents: Vec<_> = outcome.documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["# first", "second", "third"]);
        assert_eq!(outcome.unsupported_files, 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].path.ends_with("blank.txt"));
    }

    #[test]
    fn test_load_directory_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.txt"), "fine").unwrap();
        fs::write(dir.path().join("bad.pdf"), "not a pdf").unwrap();

        let outcome = loader().load_directory(dir.path()).unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].path.ends_with("bad.pdf"));
    }

    #[test]
    fn test_load_directory_missing() {
        let err = loader()
            .load_directory(Path::new("/nonexistent/rag-one/docs"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_load_directory_without_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.csv"), "a,b").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();

        let err = loader().load_directory(dir.path()).unwrap_err();
        assert!(matches!(err, DocumentError::NoDocuments { skipped: 1, .. }));
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("notes.txt"), "internal").unwrap();
        fs::write(dir.path().join("~$lock.txt"), "lock").unwrap();
        fs::write(dir.path().join("real.txt"), "real").unwrap();

        let (files, unsupported) = loader().collect_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].0.ends_with("real.txt"));
        assert_eq!(unsupported, 0);
    }

    #[test]
    fn test_file_path_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            loader().load_directory(&file).unwrap_err(),
            DocumentError::DirectoryNotFound(_)
        ));
    }
}
