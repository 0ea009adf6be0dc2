//! Retrieval and answer models.

use serde::{Deserialize, Serialize};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A chunk returned by a nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk ID
    pub chunk_id: String,

    /// Cosine similarity (-1.0 to 1.0)
    pub score: f32,

    /// Chunk text
    pub content: String,

    /// Path of the document the chunk came from
    pub source: String,

    /// Position of the chunk within its document
    pub position: u32,
}

/// Answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub question: String,

    /// Generated answer text, verbatim
    pub answer: String,

    /// Deduplicated source paths in retrieval order
    pub sources: Vec<String>,

    /// Chunks the answer was built from
    pub hits: Vec<SearchHit>,

    pub duration_ms: u64,
}

impl QueryResult {
    pub fn new(question: String, answer: String, hits: Vec<SearchHit>, duration_ms: u64) -> Self {
        let sources = unique_sources(&hits);
        Self {
            question,
            answer,
            sources,
            hits,
            duration_ms,
        }
    }

    /// True when the answer was produced without any retrieved context.
    pub fn is_without_context(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Source paths of `hits`, first occurrence wins.
pub fn unique_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for hit in hits {
        if !sources.contains(&hit.source) {
            sources.push(hit.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(source: &str, position: u32) -> SearchHit {
        SearchHit {
            chunk_id: format!("{source}:{position}"),
            score: 0.5,
            content: String::new(),
            source: source.to_string(),
            position,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_unique_sources_preserves_order() {
        let hits = vec![hit("b.txt", 0), hit("a.txt", 3), hit("b.txt", 1), hit("c.pdf", 0)];
        assert_eq!(unique_sources(&hits), vec!["b.txt", "a.txt", "c.pdf"]);
    }

    #[test]
    fn test_query_result_without_context() {
        let result = QueryResult::new("q".to_string(), "a".to_string(), vec![], 3);
        assert!(result.is_without_context());
        assert!(result.sources.is_empty());
    }
}
