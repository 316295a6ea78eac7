//! Knowledge base contract.
//!
//! The sync and query pipelines only ever talk to a [`KnowledgeBase`]. Two
//! backends ship with the crate:
//!
//! | Backend | Module | Storage |
//! |---------|--------|---------|
//! | `sqlite` | [`crate::kb_sqlite`] | Local SQLite file with FTS5 |
//! | `http` | [`crate::kb_http`] | Remote document-ingestion service |

use std::path::Path;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::kb_http::HttpKnowledgeBase;
use crate::kb_sqlite::SqliteKnowledgeBase;
use crate::models::RetrievalResult;

/// `key:value` labels attached to an imported document.
pub type Tags = Vec<(String, String)>;

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Import a structured document (pdf, docx) as a whole file.
    async fn import_file(&self, path: &Path, document_id: &str, tags: &Tags) -> Result<()>;

    /// Import plain text under `document_id`. Re-importing replaces the document.
    async fn import_text(&self, content: &str, document_id: &str, tags: &Tags) -> Result<()>;

    /// Documents relevant to `query`, best first, at most `limit`, each
    /// partition scoring at least `min_relevance`.
    async fn search(
        &self,
        query: &str,
        index: &str,
        limit: usize,
        min_relevance: f64,
    ) -> Result<RetrievalResult>;

    /// Short label for status output.
    fn describe(&self) -> String;
}

/// Build the backend selected by `knowledge_base.backend`.
pub async fn open(config: &Config) -> Result<Box<dyn KnowledgeBase>> {
    let kb = &config.knowledge_base;
    match kb.backend.as_str() {
        "http" => Ok(Box::new(HttpKnowledgeBase::new(
            kb.endpoint.as_deref().unwrap_or_default(),
            kb.index.clone(),
            kb.api_key.clone(),
            config.generation.timeout_secs,
        )?)),
        _ => Ok(Box::new(
            SqliteKnowledgeBase::open(&kb.db_path, kb.index.clone(), kb.max_tokens).await?,
        )),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Recording knowledge base for pipeline tests.

    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        File { name: String, document_id: String, tags: Tags },
        Text { content: String, document_id: String, tags: Tags },
        Search { query: String, limit: usize, min_relevance: f64 },
    }

    #[derive(Default)]
    pub struct FakeKnowledgeBase {
        pub calls: Mutex<Vec<Call>>,
        pub failing_ids: HashSet<String>,
        pub fatal_ids: HashSet<String>,
        pub results: RetrievalResult,
    }

    impl FakeKnowledgeBase {
        pub fn failing(ids: &[&str]) -> Self {
            Self {
                failing_ids: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn returning(results: RetrievalResult) -> Self {
            Self {
                results,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self, document_id: &str) -> Result<()> {
            if self.fatal_ids.contains(document_id) {
                return Err(Error::config("knowledge base rejected credentials"));
            }
            if self.failing_ids.contains(document_id) {
                return Err(Error::KnowledgeBase(format!("cannot ingest {document_id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KnowledgeBase for FakeKnowledgeBase {
        async fn import_file(&self, path: &Path, document_id: &str, tags: &Tags) -> Result<()> {
            self.calls.lock().unwrap().push(Call::File {
                name: path.file_name().unwrap().to_string_lossy().to_string(),
                document_id: document_id.to_string(),
                tags: tags.clone(),
            });
            self.check(document_id)
        }

        async fn import_text(&self, content: &str, document_id: &str, tags: &Tags) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Text {
                content: content.to_string(),
                document_id: document_id.to_string(),
                tags: tags.clone(),
            });
            self.check(document_id)
        }

        async fn search(
            &self,
            query: &str,
            _index: &str,
            limit: usize,
            min_relevance: f64,
        ) -> Result<RetrievalResult> {
            self.calls.lock().unwrap().push(Call::Search {
                query: query.to_string(),
                limit,
                min_relevance,
            });
            Ok(self.results.clone())
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }
}
