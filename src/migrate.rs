use sqlx::SqlitePool;

use crate::error::Result;

/// Create the knowledge base schema. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            index_name TEXT NOT NULL,
            id TEXT NOT NULL,
            kind TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '{}',
            content_hash TEXT NOT NULL,
            imported_at INTEGER NOT NULL,
            PRIMARY KEY (index_name, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            index_name TEXT NOT NULL,
            id TEXT NOT NULL,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            PRIMARY KEY (index_name, id),
            UNIQUE(index_name, document_id, chunk_index),
            FOREIGN KEY (index_name, document_id) REFERENCES documents(index_name, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 has no IF NOT EXISTS
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='chunks_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE chunks_fts USING fts5(
                index_name UNINDEXED,
                chunk_id UNINDEXED,
                document_id UNINDEXED,
                text
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(index_name, document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_index ON documents(index_name)")
        .execute(pool)
        .await?;

    Ok(())
}
