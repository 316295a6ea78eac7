//! Imports one document into the knowledge base.
//!
//! Per-file failures become failed [`ImportOutcome`]s so the batch keeps
//! going; only fatal errors (see [`Error::is_fatal`]) are returned as `Err`.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cursor::format_timestamp;
use crate::error::{Error, Result};
use crate::knowledge::{KnowledgeBase, Tags};
use crate::models::{DocumentCandidate, ImportOutcome};

/// Knowledge-base identifier for a file: its base name restricted to
/// `[A-Za-z0-9._-]`, with each run of other characters collapsed to one `_`
/// and surrounding underscores trimmed. Falls back to `document`.
pub fn sanitize_document_id(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut out = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn document_tags(candidate: &DocumentCandidate, imported_at: DateTime<Utc>) -> Tags {
    vec![
        ("filename".to_string(), candidate.name.clone()),
        ("filepath".to_string(), candidate.path.display().to_string()),
        ("extension".to_string(), format!(".{}", candidate.extension)),
        ("imported".to_string(), format_timestamp(&imported_at)),
    ]
}

pub struct DocumentImporter<'a> {
    kb: &'a dyn KnowledgeBase,
}

impl<'a> DocumentImporter<'a> {
    pub fn new(kb: &'a dyn KnowledgeBase) -> Self {
        Self { kb }
    }

    pub async fn import(&self, candidate: &DocumentCandidate) -> Result<ImportOutcome> {
        let document_id = sanitize_document_id(&candidate.name);
        let tags = document_tags(candidate, Utc::now());
        let started = Instant::now();

        info!(
            file = %candidate.name,
            document_id = %document_id,
            size_bytes = candidate.size_bytes,
            "importing"
        );

        let result = if candidate.is_structured() {
            self.kb.import_file(&candidate.path, &document_id, &tags).await
        } else {
            match tokio::fs::read(&candidate.path).await {
                // invalid UTF-8 sequences become U+FFFD
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes);
                    self.kb.import_text(&content, &document_id, &tags).await
                }
                Err(e) => Err(Error::Import {
                    file: candidate.name.clone(),
                    reason: e.to_string(),
                }),
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                info!(file = %candidate.name, duration_ms, "imported");
                Ok(ImportOutcome {
                    candidate: candidate.clone(),
                    document_id,
                    succeeded: true,
                    duration_ms,
                    error: None,
                })
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(file = %candidate.name, error = %e, "import failed");
                Ok(ImportOutcome {
                    candidate: candidate.clone(),
                    document_id,
                    succeeded: false,
                    duration_ms,
                    error: Some(e.to_string()),
                })
            }
        }
    }
}
