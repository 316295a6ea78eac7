//! Last query results, persisted for `brain tree`.
//!
//! Stored as a compact JSON array `[{documentId, partitions:[{text, relevance}]}]`
//! and overwritten on every query.

use std::io;

use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::RetrievalResult;
use crate::state::{FileSlot, StateSlot};

/// Characters of each passage shown by the tree view.
const TREE_PREVIEW_CHARS: usize = 80;

pub struct ResultStore<S> {
    slot: S,
}

impl<S: StateSlot> ResultStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn save(&self, result: &RetrievalResult) -> Result<()> {
        let json = serde_json::to_string(result)
            .map_err(|e| Error::KnowledgeBase(format!("cannot serialize results: {}", e)))?;
        match self.slot.save(&json) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(Error::StateWrite {
                path: self.slot.location().to_path_buf(),
                source: e,
            }),
            Err(e) => {
                warn!(
                    path = %self.slot.location().display(),
                    error = %e,
                    "could not store query results"
                );
                Ok(())
            }
        }
    }

    /// `None` when no query has been stored yet or the file is unusable.
    pub fn load(&self) -> Option<RetrievalResult> {
        let raw = match self.slot.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(path = %self.slot.location().display(), error = %e, "cannot read stored results");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(path = %self.slot.location().display(), error = %e, "stored results are corrupt");
                None
            }
        }
    }
}

pub fn store_for(config: &Config) -> ResultStore<FileSlot> {
    ResultStore::new(FileSlot::new(&config.state.results_path))
}

/// First `max` characters of `text` on one line, with `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

pub fn render_tree(result: &RetrievalResult) -> String {
    let mut out = String::new();
    let docs = result.citations.len();
    for (d, citation) in result.citations.iter().enumerate() {
        let last_doc = d + 1 == docs;
        out.push_str(if last_doc { "└── " } else { "├── " });
        out.push_str(&citation.document_id);
        out.push('\n');

        let branch = if last_doc { "    " } else { "│   " };
        let parts = citation.partitions.len();
        for (p, partition) in citation.partitions.iter().enumerate() {
            let last_part = p + 1 == parts;
            out.push_str(branch);
            out.push_str(if last_part { "└── " } else { "├── " });
            out.push_str(&format!(
                "Chunk {} (relevance: {:.3})\n",
                p + 1,
                partition.relevance
            ));
            out.push_str(branch);
            out.push_str(if last_part { "    " } else { "│   " });
            out.push_str(&preview(&partition.text, TREE_PREVIEW_CHARS));
            out.push('\n');
        }
    }
    out
}

/// `brain tree`.
pub fn run_tree(config: &Config) -> Result<()> {
    match store_for(config).load() {
        None => println!("No stored results. Run `brain query` or `brain rag` first."),
        Some(result) if result.is_empty() => println!("The last query returned no results."),
        Some(result) => {
            println!("Last query results");
            print!("{}", render_tree(&result));
        }
    }
    Ok(())
}
