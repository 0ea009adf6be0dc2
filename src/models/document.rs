use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported input formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
    Docx,
    Spreadsheet,
}

impl DocumentFormat {
    /// Detect the format of a file from its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "md" => Some(DocumentFormat::Text),
            "docx" => Some(DocumentFormat::Docx),
            "xlsx" | "xlsm" | "xls" => Some(DocumentFormat::Spreadsheet),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Text => write!(f, "text"),
            DocumentFormat::Docx => write!(f, "docx"),
            DocumentFormat::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// Text extracted from one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub source: String,
    pub format: DocumentFormat,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub source: String,
    pub content: String,
    pub position: u32,
    pub total_chunks: u32,
    pub start_offset: u64,
    pub end_offset: u64,
}

impl Document {
    pub fn generate_id(source: &str) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(source.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(content: String, source: String, format: DocumentFormat, size_bytes: u64) -> Self {
        let id = Self::generate_id(&source);
        Self {
            id,
            content,
            source,
            format,
            size_bytes,
        }
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

impl DocumentChunk {
    pub fn generate_id(document_id: &str, position: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, position);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        position: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        Self {
            id: Self::generate_id(&document.id, position),
            document_id: document.id.clone(),
            source: document.source.clone(),
            content,
            position,
            total_chunks,
            start_offset,
            end_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/report.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.txt")),
            Some(DocumentFormat::Text)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("README.md")),
            Some(DocumentFormat::Text)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("cv.docx")),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("Budget.XLSX")),
            Some(DocumentFormat::Spreadsheet)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("old.xls")),
            Some(DocumentFormat::Spreadsheet)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("legacy.doc")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_document_generate_id() {
        let id = Document::generate_id("/path/to/file.txt");
        assert_eq!(id.len(), 32);
        assert_eq!(id, Document::generate_id("/path/to/file.txt"));
    }

    #[test]
    fn test_chunk_generate_id() {
        let id = DocumentChunk::generate_id("abc123", 5);
        assert_eq!(id.len(), 36);
        assert_eq!(id, DocumentChunk::generate_id("abc123", 5));
        assert_ne!(id, DocumentChunk::generate_id("abc123", 6));
    }

    #[test]
    fn test_char_len_counts_unicode_scalars() {
        let doc = Document::new("héllo".to_string(), "x".to_string(), DocumentFormat::Text, 6);
        assert_eq!(doc.char_len(), 5);
    }
}
