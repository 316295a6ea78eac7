//! `brain status` and `brain list`: views of the configuration, the
//! documents folder and the sync cursor.
//!
//! Neither command imports documents or moves the cursor. `brain status`
//! opens an existing index, which applies pending schema migrations. The
//! synced flag in `brain list` is derived
//! from the cursor at read time: a document counts as synced when its
//! effective modification time is older than the last successful batch.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Config;
use crate::cursor::{format_timestamp, SyncCursor};
use crate::error::Result;
use crate::kb_sqlite::SqliteKnowledgeBase;
use crate::models::DocumentCandidate;
use crate::progress::format_number;
use crate::scanner;
use crate::state::StateSlot;
use crate::sync::cursor_for;

/// One line of `brain list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub name: String,
    pub size_bytes: u64,
    pub extension: String,
    pub modified_at: DateTime<Utc>,
    pub synced: bool,
}

pub fn list_rows(candidates: &[DocumentCandidate], cursor: DateTime<Utc>) -> Vec<ListRow> {
    candidates
        .iter()
        .map(|c| ListRow {
            name: c.name.clone(),
            size_bytes: c.size_bytes,
            extension: c.extension.clone(),
            modified_at: c.effective_modified_at,
            synced: c.effective_modified_at < cursor,
        })
        .collect()
}

/// Cursor used to mark documents as synced. When neither the stored value
/// nor the default is usable, nothing counts as synced.
pub fn list_cursor<S: StateSlot>(cursor: &SyncCursor<S>) -> Option<DateTime<Utc>> {
    match cursor.get() {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(error = %e, "no usable sync cursor, listing every document as pending");
            None
        }
    }
}

/// `brain list`.
pub fn run_list(config: &Config) -> Result<()> {
    let folder = &config.documents.folder;
    let candidates = scanner::scan(folder)?;
    let last_sync = list_cursor(&cursor_for(config));
    let cursor = last_sync.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let rows = list_rows(&candidates, cursor);

    println!("{}", folder.display());
    if rows.is_empty() {
        println!("  No supported documents.");
        return Ok(());
    }

    println!(
        "  {:<40} {:>10}  {:<5} {:<19}  {}",
        "FILE", "SIZE (KB)", "TYPE", "MODIFIED", "SYNCED"
    );
    for row in &rows {
        println!(
            "  {:<40} {:>10.1}  {:<5} {:<19}  {}",
            row.name,
            row.size_bytes as f64 / 1024.0,
            format!(".{}", row.extension),
            format_timestamp(&row.modified_at),
            if row.synced { "yes" } else { "no" }
        );
    }

    let pending = rows.iter().filter(|r| !r.synced).count();
    println!();
    println!(
        "  {} documents, {} pending (last sync {})",
        format_number(rows.len() as u64),
        format_number(pending as u64),
        last_sync
            .map(|ts| format_timestamp(&ts))
            .unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}

/// `brain status`.
pub async fn run_status(config: &Config) -> Result<()> {
    let generation = &config.generation;
    let kb = &config.knowledge_base;

    println!("Second Brain status");
    println!("===================");
    println!();
    if generation.is_hosted() {
        println!("  Mode:        hosted (Cloudflare Workers AI)");
        println!("  Model:       {}", generation.hosted.model);
    } else {
        println!("  Mode:        local (Ollama at {})", generation.local.endpoint);
        println!("  Model:       {}", generation.local.model);
        println!("  Chat model:  {}", generation.local.chat_model);
    }

    println!();
    match kb.backend.as_str() {
        "http" => {
            println!(
                "  Knowledge:   http ({})",
                kb.endpoint.as_deref().unwrap_or("<unset>")
            );
        }
        _ => {
            println!("  Knowledge:   sqlite ({})", kb.db_path.display());
            if kb.db_path.exists() {
                let store =
                    SqliteKnowledgeBase::open(&kb.db_path, kb.index.clone(), kb.max_tokens).await?;
                println!(
                    "  Indexed:     {} documents",
                    format_number(store.document_count().await? as u64)
                );
                store.close().await;
            } else {
                println!("  Indexed:     none (run `brain sync`)");
            }
        }
    }
    println!("  Index:       {}", kb.index);

    println!();
    let folder = &config.documents.folder;
    if folder.is_dir() {
        let count = scanner::scan(folder)?.len();
        println!(
            "  Documents:   {} ({} supported files)",
            folder.display(),
            format_number(count as u64)
        );
    } else {
        println!("  Documents:   {} (missing)", folder.display());
    }

    let cursor = cursor_for(config);
    if cursor.slot().exists() {
        println!("  Last sync:   {}", format_timestamp(&cursor.get()?));
    } else {
        println!("  Last sync:   never");
    }
    println!();
    Ok(())
}
