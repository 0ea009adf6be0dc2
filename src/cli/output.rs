use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use serde::Serialize;

use crate::models::{OutputFormat, QueryResult};
use crate::services::{IndexReport, IndexStats};
use crate::utils::preview;

pub trait Formatter {
    fn format_answer(&self, result: &QueryResult) -> String;
    fn format_index_report(&self, report: &IndexReport) -> String;
    fn format_file_list(&self, files: &FileList) -> String;
    fn format_info(&self, info: &InfoReport) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

/// Files a dry run would index.
#[derive(Debug, Clone, Serialize)]
pub struct FileList {
    pub documents_path: PathBuf,
    pub files: Vec<PathBuf>,
    pub unsupported_files: usize,
}

/// Result of probing the generation service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCheck {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Configuration and index state shown by `info`.
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub config_file: Option<PathBuf>,
    pub documents_path: PathBuf,
    pub index_path: PathBuf,
    pub generation_url: String,
    pub generation_model: String,
    pub embedding_backend: String,
    pub embedding_model: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub top_k: u32,
    pub index: Option<IndexStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceCheck>,
}

pub struct TextFormatter;

impl TextFormatter {
    fn answer(result: &QueryResult) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "Question: {}\n", result.question)?;
        writeln!(output, "Answer:")?;
        writeln!(output, "{}", result.answer.trim_end())?;

        if !result.sources.is_empty() {
            writeln!(output, "\nSources:")?;
            for (i, source) in result.sources.iter().enumerate() {
                writeln!(output, "  {}. {}", i + 1, source)?;
            }
        }
        Ok(output)
    }

    fn index_report(report: &IndexReport) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "Indexing Complete")?;
        writeln!(output, "-----------------")?;
        writeln!(output, "Documents path:    {}", report.documents_path.display())?;
        writeln!(output, "Documents indexed: {}", report.documents)?;
        writeln!(output, "Chunks created:    {}", report.chunks)?;
        writeln!(output, "Files skipped:     {}", report.skipped.len())?;
        writeln!(output, "Unsupported files: {}", report.unsupported_files)?;
        writeln!(output, "Embedding model:   {}", report.embedding_model)?;
        writeln!(output, "Index:             {}", report.index_path.display())?;
        writeln!(output, "Duration:          {}ms", report.duration_ms)?;

        if !report.skipped.is_empty() {
            writeln!(output, "\nSkipped:")?;
            for skipped in &report.skipped {
                writeln!(output, "  {}: {}", skipped.path.display(), skipped.reason)?;
            }
        }
        Ok(output)
    }

    fn file_list(files: &FileList) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(
            output,
            "Dry run: would index {} files from {}",
            files.files.len(),
            files.documents_path.display()
        )?;
        for file in &files.files {
            writeln!(output, "  {}", file.display())?;
        }
        if files.unsupported_files > 0 {
            writeln!(output, "({} unsupported files ignored)", files.unsupported_files)?;
        }
        Ok(output)
    }

    fn info(info: &InfoReport) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "RAG One")?;
        writeln!(output, "-------")?;
        if let Some(ref path) = info.config_file {
            writeln!(output, "Config file:     {}", path.display())?;
        }
        writeln!(output, "Documents path:  {}", info.documents_path.display())?;
        writeln!(output, "Ollama URL:      {}", info.generation_url)?;
        writeln!(output, "Ollama model:    {}", info.generation_model)?;
        writeln!(
            output,
            "Embeddings:      {} ({})",
            info.embedding_model, info.embedding_backend
        )?;
        writeln!(
            output,
            "Chunking:        {} chars, {} overlap",
            info.chunk_size, info.chunk_overlap
        )?;
        writeln!(output, "Top-K:           {}", info.top_k)?;
        writeln!(output)?;

        match (&info.index, &info.index_error) {
            (_, Some(err)) => {
                writeln!(output, "Vector index:    [UNREADABLE] {}", err)?;
            }
            (Some(stats), None) => {
                writeln!(output, "Vector index:    [PRESENT] {}", stats.path.display())?;
                writeln!(output, "  Chunks:        {}", stats.entries)?;
                writeln!(output, "  Documents:     {}", stats.documents)?;
                writeln!(output, "  Model:         {}", stats.embedding_model)?;
                writeln!(output, "  Dimension:     {}", stats.dimension)?;
                writeln!(
                    output,
                    "  Built:         {}",
                    stats.built_at.format("%Y-%m-%d %H:%M:%S UTC")
                )?;
            }
            (None, None) => {
                writeln!(output, "Vector index:    [NOT FOUND] {}", info.index_path.display())?;
                writeln!(output, "  Run 'rag-one index' to create it")?;
            }
        }

        if let Some(ref service) = info.service {
            if service.reachable {
                writeln!(output, "Ollama service:  [REACHABLE]")?;
            } else {
                writeln!(
                    output,
                    "Ollama service:  [UNREACHABLE] {}",
                    service.error.as_deref().unwrap_or("")
                )?;
            }
        }
        Ok(output)
    }
}

impl Formatter for TextFormatter {
    fn format_answer(&self, result: &QueryResult) -> String {
        Self::answer(result).unwrap_or_default()
    }

    fn format_index_report(&self, report: &IndexReport) -> String {
        Self::index_report(report).unwrap_or_default()
    }

    fn format_file_list(&self, files: &FileList) -> String {
        Self::file_list(files).unwrap_or_default()
    }

    fn format_info(&self, info: &InfoReport) -> String {
        Self::info(info).unwrap_or_default()
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut json = result.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string());
        json.push('\n');
        json
    }
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, result: &QueryResult) -> String {
        self.to_json(result)
    }

    fn format_index_report(&self, report: &IndexReport) -> String {
        self.to_json(report)
    }

    fn format_file_list(&self, files: &FileList) -> String {
        self.to_json(files)
    }

    fn format_info(&self, info: &InfoReport) -> String {
        self.to_json(info)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({ "error": error }))
    }
}

pub struct MarkdownFormatter;

impl MarkdownFormatter {
    fn answer(result: &QueryResult) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "## {}\n", result.question)?;
        writeln!(output, "{}\n", result.answer.trim_end())?;

        if !result.sources.is_empty() {
            writeln!(output, "### Sources\n")?;
            for (i, source) in result.sources.iter().enumerate() {
                writeln!(output, "{}. `{}`", i + 1, source)?;
            }
            writeln!(output)?;
        }

        if !result.hits.is_empty() {
            writeln!(output, "<details><summary>Retrieved passages</summary>\n")?;
            for hit in &result.hits {
                writeln!(
                    output,
                    "- **{:.3}** `{}` #{}: {}",
                    hit.score,
                    hit.source,
                    hit.position,
                    preview(&hit.content, 160).replace('\n', " ")
                )?;
            }
            writeln!(output, "\n</details>")?;
        }
        Ok(output)
    }

    fn index_report(report: &IndexReport) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "## Indexing Complete\n")?;
        writeln!(output, "| Metric | Value |")?;
        writeln!(output, "|--------|-------|")?;
        writeln!(output, "| Documents indexed | {} |", report.documents)?;
        writeln!(output, "| Chunks created | {} |", report.chunks)?;
        writeln!(output, "| Files skipped | {} |", report.skipped.len())?;
        writeln!(output, "| Unsupported files | {} |", report.unsupported_files)?;
        writeln!(output, "| Embedding model | `{}` |", report.embedding_model)?;
        writeln!(output, "| Duration | {}ms |", report.duration_ms)?;

        if !report.skipped.is_empty() {
            writeln!(output, "\n### Skipped files\n")?;
            for skipped in &report.skipped {
                writeln!(output, "- `{}`: {}", skipped.path.display(), skipped.reason)?;
            }
        }
        Ok(output)
    }

    fn file_list(files: &FileList) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "## Dry run\n")?;
        writeln!(
            output,
            "Would index {} files from `{}`:\n",
            files.files.len(),
            files.documents_path.display()
        )?;
        for file in &files.files {
            writeln!(output, "- `{}`", file.display())?;
        }
        Ok(output)
    }

    fn info(info: &InfoReport) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output, "## RAG One\n")?;
        writeln!(output, "- **Documents path:** `{}`", info.documents_path.display())?;
        writeln!(output, "- **Ollama URL:** `{}`", info.generation_url)?;
        writeln!(output, "- **Ollama model:** {}", info.generation_model)?;
        writeln!(
            output,
            "- **Embeddings:** {} ({})",
            info.embedding_model, info.embedding_backend
        )?;
        writeln!(output, "- **Top-K:** {}\n", info.top_k)?;

        match &info.index {
            Some(stats) => {
                writeln!(output, "### Vector index ✅\n")?;
                writeln!(output, "- **Chunks:** {}", stats.entries)?;
                writeln!(output, "- **Documents:** {}", stats.documents)?;
                writeln!(output, "- **Model:** {}", stats.embedding_model)?;
                writeln!(output, "- **Built:** {}", stats.built_at.to_rfc3339())?;
            }
            None => {
                writeln!(output, "### Vector index ❌\n")?;
                writeln!(
                    output,
                    "{}",
                    info.index_error
                        .as_deref()
                        .unwrap_or("Run `rag-one index` to create it.")
                )?;
            }
        }

        if let Some(ref service) = info.service {
            let status = if service.reachable { "✅" } else { "❌" };
            writeln!(output, "\n### Ollama service {}", status)?;
        }
        Ok(output)
    }
}

impl Formatter for MarkdownFormatter {
    fn format_answer(&self, result: &QueryResult) -> String {
        Self::answer(result).unwrap_or_default()
    }

    fn format_index_report(&self, report: &IndexReport) -> String {
        Self::index_report(report).unwrap_or_default()
    }

    fn format_file_list(&self, files: &FileList) -> String {
        Self::file_list(files).unwrap_or_default()
    }

    fn format_info(&self, info: &InfoReport) -> String {
        Self::info(info).unwrap_or_default()
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchHit;
    use crate::sources::SkippedFile;

    fn result() -> QueryResult {
        let hits = vec![
            SearchHit {
                chunk_id: "1".to_string(),
                score: 0.91,
                content: "Owners drop values.".to_string(),
                source: "docs/rust.txt".to_string(),
                position: 0,
            },
            SearchHit {
                chunk_id: "2".to_string(),
                score: 0.52,
                content: "Borrowing.".to_string(),
                source: "docs/rust.txt".to_string(),
                position: 1,
            },
        ];
        QueryResult::new("Who drops?".to_string(), "The owner.".to_string(), hits, 12)
    }

    fn report() -> IndexReport {
        IndexReport {
            documents_path: PathBuf::from("data/documents"),
            documents: 2,
            chunks: 7,
            skipped: vec![SkippedFile {
                path: PathBuf::from("data/documents/scan.pdf"),
                reason: "no text content".to_string(),
            }],
            unsupported_files: 1,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            index_path: PathBuf::from("data/vector_store/index.sqlite3"),
            duration_ms: 40,
        }
    }

    #[test]
    fn test_text_answer_lists_numbered_sources() {
        let text = TextFormatter.format_answer(&result());
        assert!(text.contains("Answer:\nThe owner.\n"));
        assert!(text.contains("Sources:\n  1. docs/rust.txt\n"));
        assert!(!text.contains("  2. "));
    }

    #[test]
    fn test_json_answer() {
        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format_answer(&result())).unwrap();
        assert_eq!(json["answer"], "The owner.");
        assert_eq!(json["sources"], serde_json::json!(["docs/rust.txt"]));
        assert_eq!(json["hits"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_index_report_mentions_skipped_files() {
        let text = TextFormatter.format_index_report(&report());
        assert!(text.contains("Documents indexed: 2"));
        assert!(text.contains("Chunks created:    7"));
        assert!(text.contains("scan.pdf: no text content"));

        let md = MarkdownFormatter.format_index_report(&report());
        assert!(md.contains("| Chunks created | 7 |"));
        assert!(md.contains("`data/documents/scan.pdf`"));
    }

    #[test]
    fn test_info_without_index() {
        let info = InfoReport {
            config_file: None,
            documents_path: PathBuf::from("data/documents"),
            index_path: PathBuf::from("data/vector_store"),
            generation_url: "http://localhost:11434".to_string(),
            generation_model: "llama2".to_string(),
            embedding_backend: "onnx".to_string(),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            index: None,
            index_error: None,
            service: Some(ServiceCheck {
                reachable: false,
                error: Some("connection refused".to_string()),
            }),
        };

        let text = TextFormatter.format_info(&info);
        assert!(text.contains("[NOT FOUND]"));
        assert!(text.contains("rag-one index"));
        assert!(text.contains("[UNREACHABLE] connection refused"));

        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(true).format_info(&info)).unwrap();
        assert!(json["index"].is_null());
        assert_eq!(json["service"]["reachable"], false);
    }

    #[test]
    fn test_messages() {
        assert_eq!(TextFormatter.format_error("boom"), "Error: boom\n");
        assert_eq!(
            JsonFormatter::new(false).format_message("hi"),
            "{\"message\":\"hi\"}\n"
        );
    }
}
