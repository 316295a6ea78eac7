//! Client for a remote document-ingestion service.
//!
//! Speaks the Kernel Memory web API:
//!
//! - `POST {endpoint}/upload`: multipart form with `index`, `documentId`,
//!   repeated `tags` (`key:value`) and one file part.
//! - `POST {endpoint}/search`: `{index, query, minRelevance, limit}` →
//!   `{results: [{documentId, partitions: [{text, relevance}]}]}`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::knowledge::{KnowledgeBase, Tags};
use crate::models::{Citation, RetrievalResult};

pub struct HttpKnowledgeBase {
    client: reqwest::Client,
    endpoint: String,
    index: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Citation>,
}

impl HttpKnowledgeBase {
    pub fn new(
        endpoint: &str,
        index: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index: index.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn post(&self, route: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}/{}", self.endpoint, route));
        match &self.api_key {
            Some(key) => request.header("Authorization", key),
            None => request,
        }
    }

    async fn upload(&self, file: Part, document_id: &str, tags: &Tags) -> Result<()> {
        let mut form = Form::new()
            .text("index", self.index.clone())
            .text("documentId", document_id.to_string());
        for (key, value) in tags {
            form = form.text("tags", format!("{}:{}", key, value));
        }
        form = form.part("file", file);

        let response = self.post("upload").multipart(form).send().await.map_err(|e| {
            ProviderError::new(format!(
                "knowledge base unreachable at {}: {}",
                self.endpoint, e
            ))
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::with_status("knowledge base rejected upload", status.as_u16(), body).into());
        }
        debug!(document_id, "uploaded document");
        Ok(())
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn import_file(&self, path: &Path, document_id: &str, tags: &Tags) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| document_id.to_string());
        self.upload(Part::bytes(bytes).file_name(file_name), document_id, tags)
            .await
    }

    async fn import_text(&self, content: &str, document_id: &str, tags: &Tags) -> Result<()> {
        let part = Part::text(content.to_string())
            .file_name(format!("{}.txt", document_id))
            .mime_str("text/plain")?;
        self.upload(part, document_id, tags).await
    }

    async fn search(
        &self,
        query: &str,
        index: &str,
        limit: usize,
        min_relevance: f64,
    ) -> Result<RetrievalResult> {
        let body = serde_json::json!({
            "index": index,
            "query": query,
            "minRelevance": min_relevance,
            "limit": limit,
        });

        let response = self.post("search").json(&body).send().await.map_err(|e| {
            ProviderError::new(format!(
                "knowledge base unreachable at {}: {}",
                self.endpoint, e
            ))
        })?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::with_status("knowledge base search failed", status.as_u16(), text).into());
        }

        let parsed: SearchResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::with_status(
                format!("invalid knowledge base search response: {}", e),
                status.as_u16(),
                text.clone(),
            )
        })?;
        Ok(RetrievalResult {
            citations: parsed.results,
        })
    }

    fn describe(&self) -> String {
        format!("http ({})", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use httpmock::prelude::*;
    use serde_json::json;

    fn kb(server: &MockServer) -> HttpKnowledgeBase {
        HttpKnowledgeBase::new(&server.base_url(), "notes", Some("secret".into()), 5).unwrap()
    }

    #[tokio::test]
    async fn search_posts_query_and_parses_results() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/search")
                    .header("Authorization", "secret")
                    .json_body(json!({
                        "index": "notes",
                        "query": "budget",
                        "minRelevance": 0.3,
                        "limit": 5
                    }));
                then.status(200).json_body(json!({
                    "query": "budget",
                    "noResult": false,
                    "results": [{
                        "documentId": "q3-plan",
                        "partitions": [{"text": "Budget is 10k", "relevance": 0.81}]
                    }]
                }));
            })
            .await;

        let result = kb(&server).search("budget", "notes", 5, 0.3).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.document_ids(), vec!["q3-plan"]);
        assert_eq!(result.citations[0].partitions[0].relevance, 0.81);
    }

    #[tokio::test]
    async fn search_error_carries_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/search");
                then.status(503).body("warming up");
            })
            .await;

        let err = kb(&server).search("x", "notes", 5, 0.3).await.unwrap_err();
        match err {
            Error::Provider(p) => {
                assert_eq!(p.status, Some(503));
                assert_eq!(p.body.as_deref(), Some("warming up"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn import_text_uploads_multipart() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload")
                    .body_includes("q3-plan")
                    .body_includes("filename:q3 plan.md")
                    .body_includes("the plan");
                then.status(202);
            })
            .await;

        let tags = vec![("filename".to_string(), "q3 plan.md".to_string())];
        kb(&server).import_text("the plan", "q3-plan", &tags).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_upload_is_provider_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/upload");
                then.status(400).body("bad document");
            })
            .await;

        let err = kb(&server).import_text("x", "doc", &Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(!err.is_fatal());
    }
}
