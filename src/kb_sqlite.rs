//! Embedded knowledge base backed by SQLite + FTS5.
//!
//! Documents are keyed by index name and sanitized identifier; importing
//! the same identifier into the same index again replaces its chunks. Structured files are converted to
//! text locally by [`crate::extract`] before chunking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::chunk::chunk_text;
use crate::db;
use crate::error::{Error, Result};
use crate::extract::extract_text;
use crate::knowledge::{KnowledgeBase, Tags};
use crate::migrate;
use crate::models::{Chunk, RetrievalResult};
use crate::search::{self, ChunkHit};

/// Upper bound on FTS5 candidates fetched per search.
const MAX_CANDIDATES: usize = 200;

pub struct SqliteKnowledgeBase {
    pool: SqlitePool,
    path: PathBuf,
    index: String,
    max_tokens: usize,
}

impl SqliteKnowledgeBase {
    /// Connect and make sure the schema exists.
    pub async fn open(path: &Path, index: impl Into<String>, max_tokens: usize) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
            index: index.into(),
            max_tokens,
        })
    }

    pub async fn document_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE index_name = ?")
            .bind(&self.index)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn store(&self, document_id: &str, kind: &str, body: &str, tags: &Tags) -> Result<usize> {
        let chunks = chunk_text(document_id, body, self.max_tokens);
        let content_hash = format!("{:x}", Sha256::digest(body.as_bytes()));
        let tags_json = serde_json::to_string(&tags.iter().cloned().collect::<BTreeMap<_, _>>())
            .map_err(|e| Error::KnowledgeBase(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks_fts WHERE index_name = ? AND document_id = ?")
            .bind(&self.index)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE index_name = ? AND document_id = ?")
            .bind(&self.index)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (index_name, id, kind, tags_json, content_hash, imported_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(index_name, id) DO UPDATE SET
                kind = excluded.kind,
                tags_json = excluded.tags_json,
                content_hash = excluded.content_hash,
                imported_at = excluded.imported_at
            "#,
        )
        .bind(&self.index)
        .bind(document_id)
        .bind(kind)
        .bind(&tags_json)
        .bind(&content_hash)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        for chunk in &chunks {
            insert_chunk(&mut tx, &self.index, chunk).await?;
        }

        tx.commit().await?;
        debug!(document_id, chunks = chunks.len(), "stored document");
        Ok(chunks.len())
    }
}

async fn insert_chunk(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    index: &str,
    chunk: &Chunk,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO chunks (index_name, id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(index)
    .bind(&chunk.id)
    .bind(&chunk.document_id)
    .bind(chunk.chunk_index)
    .bind(&chunk.text)
    .bind(&chunk.hash)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO chunks_fts (index_name, chunk_id, document_id, text) VALUES (?, ?, ?, ?)",
    )
    .bind(index)
    .bind(&chunk.id)
    .bind(&chunk.document_id)
    .bind(&chunk.text)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl KnowledgeBase for SqliteKnowledgeBase {
    async fn import_file(&self, path: &Path, document_id: &str, tags: &Tags) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let kind = extension.clone();
        let body = tokio::task::spawn_blocking(move || extract_text(&bytes, &extension))
            .await
            .map_err(|e| Error::KnowledgeBase(format!("extraction task failed: {}", e)))?
            .map_err(|e| Error::KnowledgeBase(e.to_string()))?;

        self.store(document_id, &kind, &body, tags).await?;
        Ok(())
    }

    async fn import_text(&self, content: &str, document_id: &str, tags: &Tags) -> Result<()> {
        self.store(document_id, "text", content, tags).await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        index: &str,
        limit: usize,
        min_relevance: f64,
    ) -> Result<RetrievalResult> {
        let terms = search::query_terms(query);
        if terms.is_empty() || limit == 0 {
            return Ok(RetrievalResult::default());
        }

        let candidate_k = limit.saturating_mul(20).min(MAX_CANDIDATES) as i64;
        let rows = sqlx::query(
            r#"
            SELECT c.document_id, c.chunk_index, c.text
            FROM chunks_fts f
            JOIN chunks c ON c.index_name = f.index_name AND c.id = f.chunk_id
            JOIN documents d ON d.index_name = c.index_name AND d.id = c.document_id
            WHERE chunks_fts MATCH ? AND f.index_name = ?
            ORDER BY f.rank
            LIMIT ?
            "#,
        )
        .bind(search::match_expression(&terms))
        .bind(index)
        .bind(candidate_k)
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| ChunkHit {
                document_id: row.get("document_id"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
            })
            .collect();

        Ok(search::rank(hits, &terms, limit, min_relevance))
    }

    fn describe(&self) -> String {
        format!("sqlite ({})", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> SqliteKnowledgeBase {
        SqliteKnowledgeBase::open(&tmp.path().join("kb.sqlite"), "default", 200)
            .await
            .unwrap()
    }

    fn tags(name: &str) -> Tags {
        vec![("filename".to_string(), name.to_string())]
    }

    #[tokio::test]
    async fn import_then_search() {
        let tmp = TempDir::new().unwrap();
        let kb = open(&tmp).await;
        kb.import_text(
            "Rust ownership rules.\n\nThe borrow checker enforces them.",
            "rust-notes",
            &tags("rust-notes.md"),
        )
        .await
        .unwrap();
        kb.import_text("Sourdough needs a starter.", "baking", &tags("baking.md"))
            .await
            .unwrap();

        let result = kb.search("borrow checker", "default", 5, 0.3).await.unwrap();
        assert_eq!(result.document_ids(), vec!["rust-notes"]);
        assert_eq!(result.citations[0].partitions[0].relevance, 1.0);
    }

    #[tokio::test]
    async fn reimport_replaces_chunks() {
        let tmp = TempDir::new().unwrap();
        let kb = open(&tmp).await;
        kb.import_text("old topic zebra", "doc", &tags("doc.md")).await.unwrap();
        kb.import_text("new topic giraffe", "doc", &tags("doc.md")).await.unwrap();

        assert!(kb.search("zebra", "default", 5, 0.0).await.unwrap().is_empty());
        assert_eq!(
            kb.search("giraffe", "default", 5, 0.0).await.unwrap().document_ids(),
            vec!["doc"]
        );
        assert_eq!(kb.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_is_scoped_to_index() {
        let tmp = TempDir::new().unwrap();
        let kb = open(&tmp).await;
        kb.import_text("lighthouse keeper", "doc", &tags("doc.md")).await.unwrap();
        assert!(kb.search("lighthouse", "other", 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stopword_only_query_returns_nothing() {
        let tmp = TempDir::new().unwrap();
        let kb = open(&tmp).await;
        kb.import_text("the and of", "doc", &tags("doc.md")).await.unwrap();
        assert!(kb.search("the of", "default", 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_pdf_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let kb = open(&tmp).await;
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();
        let err = kb.import_file(&path, "broken", &tags("broken.pdf")).await.unwrap_err();
        assert!(matches!(err, Error::KnowledgeBase(_)));
    }

    #[tokio::test]
    async fn same_id_in_two_indexes_stays_in_both() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.sqlite");
        let work = SqliteKnowledgeBase::open(&path, "work", 200).await.unwrap();
        let home = SqliteKnowledgeBase::open(&path, "home", 200).await.unwrap();
        work.import_text("quarterly roadmap review", "notes", &tags("notes.md"))
            .await
            .unwrap();
        home.import_text("garden watering schedule", "notes", &tags("notes.md"))
            .await
            .unwrap();

        assert_eq!(work.document_count().await.unwrap(), 1);
        assert_eq!(home.document_count().await.unwrap(), 1);
        assert_eq!(
            work.search("roadmap", "work", 5, 0.0).await.unwrap().document_ids(),
            vec!["notes"]
        );
        assert_eq!(
            home.search("garden", "home", 5, 0.0).await.unwrap().document_ids(),
            vec!["notes"]
        );
        assert!(work.search("garden", "work", 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn huge_limit_is_capped() {
        let tmp = TempDir::new().unwrap();
        let kb = open(&tmp).await;
        kb.import_text("lighthouse keeper", "doc", &tags("doc.md")).await.unwrap();
        let result = kb.search("lighthouse", "default", usize::MAX, 0.0).await.unwrap();
        assert_eq!(result.document_ids(), vec!["doc"]);
    }
}
