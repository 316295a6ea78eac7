//! Knowledge base search and context assembly.

use tracing::debug;

use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::models::RetrievalResult;

/// Passages used per document when building context.
pub const PARTITIONS_PER_DOCUMENT: usize = 3;

pub const NO_CONTEXT: &str = "No relevant information found in the knowledge base.";

pub struct RetrievalClient<'a> {
    kb: &'a dyn KnowledgeBase,
    index: String,
    limit: usize,
    min_relevance: f64,
}

impl<'a> RetrievalClient<'a> {
    pub fn new(kb: &'a dyn KnowledgeBase, index: impl Into<String>, limit: usize, min_relevance: f64) -> Self {
        Self {
            kb,
            index: index.into(),
            limit,
            min_relevance,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let result = self
            .kb
            .search(question, &self.index, self.limit, self.min_relevance)
            .await?;
        debug!(
            documents = result.citations.len(),
            limit = self.limit,
            min_relevance = self.min_relevance,
            "retrieved"
        );
        Ok(result)
    }
}

/// First [`PARTITIONS_PER_DOCUMENT`] passages of each document, in result
/// order, each followed by a blank line.
pub fn assemble_context(result: &RetrievalResult) -> String {
    if result.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let mut context = String::new();
    for citation in &result.citations {
        for partition in citation.partitions.iter().take(PARTITIONS_PER_DOCUMENT) {
            context.push_str(&partition.text);
            context.push_str("\n\n");
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::fake::{Call, FakeKnowledgeBase};
    use crate::models::{Citation, Partition};

    fn citation(id: &str, texts: &[&str]) -> Citation {
        Citation {
            document_id: id.to_string(),
            partitions: texts
                .iter()
                .map(|t| Partition {
                    text: t.to_string(),
                    relevance: 0.5,
                })
                .collect(),
        }
    }

    #[test]
    fn context_takes_three_partitions_per_document() {
        let result = RetrievalResult {
            citations: vec![citation("a", &["a1", "a2", "a3", "a4"]), citation("b", &["b1"])],
        };
        assert_eq!(assemble_context(&result), "a1\n\na2\n\na3\n\nb1\n\n");
    }

    #[test]
    fn empty_result_gives_sentinel() {
        assert_eq!(assemble_context(&RetrievalResult::default()), NO_CONTEXT);
    }

    #[tokio::test]
    async fn retrieve_forwards_configured_limits() {
        let kb = FakeKnowledgeBase::returning(RetrievalResult {
            citations: vec![citation("a", &["x"])],
        });
        let client = RetrievalClient::new(&kb, "default", 5, 0.3).with_limit(2);
        let result = client.retrieve("what?").await.unwrap();
        assert_eq!(result.document_ids(), vec!["a"]);
        assert_eq!(
            kb.calls(),
            vec![Call::Search {
                query: "what?".into(),
                limit: 2,
                min_relevance: 0.3
            }]
        );
    }
}
