//! Keyword relevance scoring for the embedded knowledge base.
//!
//! FTS5 finds candidate chunks; each chunk is then scored by the share of
//! distinct query terms it contains, so relevance is always in `[0, 1]` and
//! comparable against `knowledge_base.min_relevance`.

use std::collections::{HashMap, HashSet};

use crate::models::{Citation, Partition, RetrievalResult};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "me", "my", "of", "on", "or", "the", "this", "that", "to", "was",
    "we", "what", "when", "where", "which", "who", "why", "with", "you", "your",
];

/// A chunk returned by the FTS5 candidate query.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Distinct, lower-cased query terms with stopwords and single characters removed.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(query)
        .filter(|t| t.chars().count() > 1 && !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// FTS5 `MATCH` expression: every term quoted, joined with `OR`.
pub fn match_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Fraction of `terms` present in `text`.
pub fn coverage(terms: &[String], text: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let present: HashSet<String> = tokens(text).collect();
    let hits = terms.iter().filter(|t| present.contains(*t)).count();
    hits as f64 / terms.len() as f64
}

/// Group scored hits by document. Partitions below `min_relevance` are
/// dropped, documents are ordered by their best partition, and at most
/// `limit` documents are returned.
pub fn rank(hits: Vec<ChunkHit>, terms: &[String], limit: usize, min_relevance: f64) -> RetrievalResult {
    let mut by_doc: HashMap<String, Vec<(i64, Partition)>> = HashMap::new();
    for hit in hits {
        let relevance = coverage(terms, &hit.text);
        if relevance < min_relevance || relevance == 0.0 {
            continue;
        }
        by_doc.entry(hit.document_id).or_default().push((
            hit.chunk_index,
            Partition {
                text: hit.text,
                relevance,
            },
        ));
    }

    let mut citations: Vec<Citation> = by_doc
        .into_iter()
        .map(|(document_id, mut parts)| {
            parts.sort_by(|a, b| {
                b.1.relevance
                    .partial_cmp(&a.1.relevance)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            Citation {
                document_id,
                partitions: parts.into_iter().map(|(_, p)| p).collect(),
            }
        })
        .collect();

    citations.sort_by(|a, b| {
        b.best_relevance()
            .partial_cmp(&a.best_relevance())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    citations.truncate(limit);

    RetrievalResult { citations }
}
