//! On-disk vector index.
//!
//! A single SQLite file holds every chunk with its embedding as a
//! little-endian `f32` blob, plus a small key/value table describing how the
//! index was built. Search is brute-force cosine similarity; re-indexing
//! writes a fresh file next to the old one and renames it into place.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use serde::Serialize;

use crate::error::IndexError;
use crate::models::{DocumentChunk, SearchHit};

pub const INDEX_FILE: &str = "index.sqlite3";

const SCHEMA_VERSION: &str = "1";

/// One chunk with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// Build-time facts recorded next to the entries.
#[derive(Debug, Clone)]
pub struct IndexMeta {
    pub embedding_model: String,
    pub documents: usize,
}

/// Summary of a stored index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub path: PathBuf,
    pub entries: u64,
    pub documents: u64,
    pub embedding_model: String,
    pub dimension: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexStats {
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// File-backed vector index rooted at a directory.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dir: PathBuf,
}

impl VectorIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the SQLite file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Replace the whole index with `entries`.
    ///
    /// The new database is written to a temporary file and renamed over the
    /// old one, so a reader sees either the previous or the new index.
    pub fn rebuild(&self, entries: &[IndexEntry], meta: &IndexMeta) -> Result<IndexStats, IndexError> {
        let dimension = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }

        std::fs::create_dir_all(&self.dir)?;

        let final_path = self.path();
        let tmp_path = self.dir.join(format!("{}.tmp", INDEX_FILE));
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)?;
        }

        let built_at = Utc::now();
        {
            let mut conn = Connection::open(&tmp_path)?;
            init_schema(&conn)?;

            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO entries (chunk_id, document_id, source, position, content, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for entry in entries {
                    stmt.execute(params![
                        entry.chunk.id,
                        entry.chunk.document_id,
                        entry.chunk.source,
                        entry.chunk.position,
                        entry.chunk.content,
                        serialize_embedding(&entry.embedding),
                    ])?;
                }
            }

            let mut meta_stmt = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            for (key, value) in [
                ("schema_version", SCHEMA_VERSION.to_string()),
                ("embedding_model", meta.embedding_model.clone()),
                ("dimension", dimension.to_string()),
                ("documents", meta.documents.to_string()),
                ("built_at", built_at.to_rfc3339()),
            ] {
                meta_stmt.execute(params![key, value])?;
            }
            drop(meta_stmt);
            tx.commit()?;
        }

        std::fs::rename(&tmp_path, &final_path)?;

        tracing::info!(
            "Wrote {} entries ({} dims) to {}",
            entries.len(),
            dimension,
            final_path.display()
        );

        Ok(IndexStats {
            path: final_path,
            entries: entries.len() as u64,
            documents: meta.documents as u64,
            embedding_model: meta.embedding_model.clone(),
            dimension,
            built_at,
        })
    }

    /// Describe the stored index, `None` when no index file exists.
    pub fn stats(&self) -> Result<Option<IndexStats>, IndexError> {
        if !self.exists() {
            return Ok(None);
        }
        let conn = self.open_read_only()?;
        read_stats(&conn, self.path()).map(Some)
    }

    /// Top `k` entries by cosine similarity to `query`, best first.
    /// Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if !self.exists() {
            return Err(IndexError::NotFound(self.dir.clone()));
        }

        let conn = self.open_read_only()?;
        let stats = read_stats(&conn, self.path())?;

        if stats.is_empty() {
            return Err(IndexError::Empty(self.dir.clone()));
        }
        if query.len() != stats.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: stats.dimension,
                actual: query.len(),
            });
        }

        let mut stmt = conn
            .prepare(
                "SELECT chunk_id, source, position, content, embedding FROM entries ORDER BY id",
            )
            .map_err(corrupt)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })
            .map_err(corrupt)?;

        let mut hits = Vec::with_capacity(stats.entries as usize);
        for row in rows {
            let (chunk_id, source, position, content, blob) = row.map_err(corrupt)?;
            let embedding = deserialize_embedding(&blob);
            if embedding.len() != stats.dimension {
                return Err(IndexError::Corrupt(format!(
                    "entry {} has {} dimensions, expected {}",
                    chunk_id,
                    embedding.len(),
                    stats.dimension
                )));
            }
            hits.push(SearchHit {
                score: cosine_similarity(query, &embedding),
                chunk_id,
                content,
                source,
                position,
            });
        }

        // sort_by is stable: equal scores stay in insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        Ok(hits)
    }

    fn open_read_only(&self) -> Result<Connection, IndexError> {
        Connection::open_with_flags(
            self.path(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(corrupt)
    }
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE entries (
            id INTEGER PRIMARY KEY,
            chunk_id TEXT NOT NULL,
            document_id TEXT NOT NULL,
            source TEXT NOT NULL,
            position INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL
        );
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
}

fn read_stats(conn: &Connection, path: PathBuf) -> Result<IndexStats, IndexError> {
    let meta = |key: &str| -> Result<String, IndexError> {
        conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| IndexError::Corrupt(format!("metadata '{}': {}", key, e)))
    };
    let parse_num = |key: &str| -> Result<u64, IndexError> {
        let value = meta(key)?;
        value
            .parse()
            .map_err(|_| IndexError::Corrupt(format!("metadata '{}' is not a number: {}", key, value)))
    };

    let entries: u64 = conn
        .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .map_err(corrupt)?;

    let built_at = DateTime::parse_from_rfc3339(&meta("built_at")?)
        .map_err(|e| IndexError::Corrupt(format!("metadata 'built_at': {}", e)))?
        .with_timezone(&Utc);

    Ok(IndexStats {
        path,
        entries,
        documents: parse_num("documents")?,
        embedding_model: meta("embedding_model")?,
        dimension: parse_num("dimension")? as usize,
        built_at,
    })
}

fn corrupt(err: rusqlite::Error) -> IndexError {
    IndexError::Corrupt(err.to_string())
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentFormat};

    fn entry(source: &str, position: u32, embedding: Vec<f32>) -> IndexEntry {
        let doc = Document::new(
            format!("text of {source}"),
            source.to_string(),
            DocumentFormat::Text,
            10,
        );
        IndexEntry {
            chunk: DocumentChunk::from_document(
                &doc,
                format!("{source} chunk {position}"),
                position,
                3,
                0,
                10,
            ),
            embedding,
        }
    }

    fn meta(documents: usize) -> IndexMeta {
        IndexMeta {
            embedding_model: "test-model".to_string(),
            documents,
        }
    }

    #[test]
    fn test_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path().join("store"));

        assert!(index.stats().unwrap().is_none());
        assert!(matches!(
            index.search(&[1.0, 0.0], 3).unwrap_err(),
            IndexError::NotFound(_)
        ));
    }

    #[test]
    fn test_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path());
        index.rebuild(&[], &meta(0)).unwrap();

        let stats = index.stats().unwrap().unwrap();
        assert_eq!(stats.entries, 0);
        assert!(matches!(
            index.search(&[1.0], 3).unwrap_err(),
            IndexError::Empty(_)
        ));
    }

    #[test]
    fn test_search_returns_exact_match_first() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path());
        let entries = vec![
            entry("a.txt", 0, vec![1.0, 0.0, 0.0]),
            entry("a.txt", 1, vec![0.0, 1.0, 0.0]),
            entry("b.txt", 0, vec![0.6, 0.8, 0.0]),
            entry("b.txt", 1, vec![0.0, 0.0, 1.0]),
        ];
        index.rebuild(&entries, &meta(2)).unwrap();

        let hits = index.search(&[0.6, 0.8, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, entries[2].chunk.id);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].chunk_id, entries[1].chunk.id);
        assert_eq!(hits[0].source, "b.txt");
        assert_eq!(hits[0].content, "b.txt chunk 0");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path());
        let entries = vec![
            entry("z.txt", 0, vec![1.0, 0.0]),
            entry("a.txt", 0, vec![1.0, 0.0]),
            entry("m.txt", 0, vec![1.0, 0.0]),
        ];
        index.rebuild(&entries, &meta(3)).unwrap();

        let sources: Vec<_> = index
            .search(&[1.0, 0.0], 10)
            .unwrap()
            .into_iter()
            .map(|h| h.source)
            .collect();
        assert_eq!(sources, vec!["z.txt", "a.txt", "m.txt"]);
    }

    #[test]
    fn test_rebuild_replaces_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path());
        index
            .rebuild(&[entry("old.txt", 0, vec![1.0, 0.0])], &meta(1))
            .unwrap();
        index
            .rebuild(
                &[entry("new.txt", 0, vec![0.0, 1.0]), entry("new.txt", 1, vec![1.0, 1.0])],
                &meta(1),
            )
            .unwrap();

        let stats = index.stats().unwrap().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.embedding_model, "test-model");
        assert_eq!(stats.dimension, 2);

        let hits = index.search(&[1.0, 0.0], 10).unwrap();
        assert!(hits.iter().all(|h| h.source == "new.txt"));
        assert!(!dir.path().join(format!("{}.tmp", INDEX_FILE)).exists());
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path());
        index
            .rebuild(&[entry("a.txt", 0, vec![1.0, 0.0])], &meta(1))
            .unwrap();

        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1).unwrap_err(),
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));

        let mixed = [entry("a.txt", 0, vec![1.0]), entry("a.txt", 1, vec![1.0, 2.0])];
        assert!(matches!(
            index.rebuild(&mixed, &meta(1)).unwrap_err(),
            IndexError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "definitely not sqlite").unwrap();
        let index = VectorIndex::new(dir.path());

        assert!(matches!(index.stats().unwrap_err(), IndexError::Corrupt(_)));
        assert!(matches!(
            index.search(&[1.0], 1).unwrap_err(),
            IndexError::Corrupt(_)
        ));
    }

    #[test]
    fn test_embedding_blob_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(deserialize_embedding(&serialize_embedding(&v)), v);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
