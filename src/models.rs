//! Core data models shared by the sync and query pipelines.
//!
//! Candidates and outcomes flow through the sync side; retrieval results,
//! conversation turns and generation responses flow through the query side.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file in the document folder that may need importing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCandidate {
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Lower-cased extension without the leading dot.
    pub extension: String,
    pub size_bytes: u64,
    /// `max(content write time, creation time)`.
    pub effective_modified_at: DateTime<Utc>,
}

impl DocumentCandidate {
    pub fn is_structured(&self) -> bool {
        matches!(self.extension.as_str(), "pdf" | "docx")
    }
}

/// Result of importing one candidate.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub candidate: DocumentCandidate,
    pub document_id: String,
    pub succeeded: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Aggregate of a sync batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[ImportOutcome], total_duration_ms: u64) -> Self {
        let succeeded_count = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            succeeded_count,
            failed_count: outcomes.len() - succeeded_count,
            total_duration_ms,
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded_count + self.failed_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A scored passage of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub text: String,
    pub relevance: f64,
}

/// One document returned by a knowledge base search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(default)]
    pub partitions: Vec<Partition>,
}

impl Citation {
    pub fn best_relevance(&self) -> f64 {
        self.partitions
            .iter()
            .map(|p| p.relevance)
            .fold(0.0, f64::max)
    }
}

/// Ordered search results, already filtered by the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalResult {
    pub citations: Vec<Citation>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    /// Distinct document ids in result order.
    pub fn document_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for citation in &self.citations {
            if !ids.contains(&citation.document_id.as_str()) {
                ids.push(&citation.document_id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
    pub token_count: Option<u64>,
    /// Wall-clock time of the whole request.
    pub elapsed_ms: u64,
    /// Time the provider reports spending on generation, when it does.
    pub generation_ms: Option<u64>,
}

impl GenerationResponse {
    /// Tokens per second when the provider reports a token count. Uses the
    /// provider's generation time when present, else wall-clock time.
    pub fn tokens_per_second(&self) -> Option<f64> {
        let tokens = self.token_count?;
        let ms = self.generation_ms.unwrap_or(self.elapsed_ms);
        if ms == 0 {
            return None;
        }
        Some(tokens as f64 / (ms as f64 / 1000.0))
    }
}

/// A chunk of a document stored by the embedded knowledge base.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}
