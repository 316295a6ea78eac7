//! Text generation providers.
//!
//! The active provider is chosen once from `generation.mode` and injected
//! into [`GenerationRouter`]:
//!
//! - **local**: an Ollama-compatible server, `POST {endpoint}/api/generate`.
//! - **hosted**: Cloudflare Workers AI,
//!   `POST {endpoint}/accounts/{account_id}/ai/run/{model}`.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ProviderError, Result};
use crate::models::GenerationResponse;

pub const NO_ANSWER: &str = "Unable to generate answer.";

#[derive(Debug, Clone)]
pub enum Provider {
    Local {
        endpoint: String,
        model: String,
    },
    Hosted {
        endpoint: String,
        account_id: String,
        api_token: String,
        model: String,
    },
}

impl Provider {
    pub fn from_config(config: &Config) -> Self {
        let generation = &config.generation;
        if generation.is_hosted() {
            Provider::Hosted {
                endpoint: generation.hosted.endpoint.trim_end_matches('/').to_string(),
                account_id: generation.hosted.account_id.clone(),
                api_token: generation.hosted.api_token.clone(),
                model: generation.hosted.model.clone(),
            }
        } else {
            Provider::Local {
                endpoint: generation.local.endpoint.trim_end_matches('/').to_string(),
                model: generation.local.model.clone(),
            }
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Provider::Local { .. } => "local",
            Provider::Hosted { .. } => "hosted",
        }
    }
}

pub struct GenerationRouter {
    client: reqwest::Client,
    provider: Provider,
}

impl GenerationRouter {
    pub fn new(provider: Provider, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, provider })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            Provider::from_config(config),
            Duration::from_secs(config.generation.timeout_secs),
        )
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Hosted mode always uses its configured model. Local mode uses a
    /// non-blank override, else the configured default.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match &self.provider {
            Provider::Hosted { model, .. } => model.clone(),
            Provider::Local { model, .. } => requested
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(model.as_str())
                .to_string(),
        }
    }

    pub async fn generate(&self, prompt: &str, model: &str) -> Result<GenerationResponse> {
        let started = Instant::now();
        let (text, token_count, generation_ms) = match &self.provider {
            Provider::Local { endpoint, .. } => self.generate_local(endpoint, prompt, model).await?,
            Provider::Hosted {
                endpoint,
                account_id,
                api_token,
                ..
            } => {
                self.generate_hosted(endpoint, account_id, api_token, prompt, model)
                    .await?
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let text = if text.trim().is_empty() {
            NO_ANSWER.to_string()
        } else {
            text
        };
        let response = GenerationResponse {
            text,
            model: model.to_string(),
            token_count,
            elapsed_ms,
            generation_ms,
        };

        match response.tokens_per_second() {
            Some(tps) => info!(
                mode = self.provider.mode(),
                model,
                tokens = token_count.unwrap_or_default(),
                elapsed_ms,
                tokens_per_sec = tps,
                "generated answer"
            ),
            None => info!(mode = self.provider.mode(), model, elapsed_ms, "generated answer"),
        }
        Ok(response)
    }

    async fn post_json(
        &self,
        request: reqwest::RequestBuilder,
        label: &str,
    ) -> Result<serde_json::Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("{} provider request failed: {}", label, e)))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::with_status(
                format!("{} provider returned an error", label),
                status.as_u16(),
                body,
            )
            .into());
        }
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::with_status(
                format!("{} provider returned malformed JSON: {}", label, e),
                status.as_u16(),
                body.clone(),
            )
            .into()
        })
    }

    async fn generate_local(
        &self,
        endpoint: &str,
        prompt: &str,
        model: &str,
    ) -> Result<(String, Option<u64>, Option<u64>)> {
        debug!(endpoint, model, prompt_chars = prompt.len(), "calling local provider");
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });
        let json = self
            .post_json(
                self.client
                    .post(format!("{}/api/generate", endpoint))
                    .json(&body),
                "local",
            )
            .await?;
        if !json.is_object() {
            return Err(ProviderError::new("local provider returned a non-object response").into());
        }

        let text = match json.get("response").and_then(|r| r.as_str()) {
            Some(text) => text.to_string(),
            None => {
                return Err(ProviderError::with_status(
                    "local provider response has no text",
                    200,
                    json.to_string(),
                )
                .into())
            }
        };
        let token_count = json.get("eval_count").and_then(|v| v.as_u64());
        // eval_duration is reported in nanoseconds
        let eval_ms = json
            .get("eval_duration")
            .and_then(|v| v.as_u64())
            .map(|ns| ns / 1_000_000)
            .filter(|ms| *ms > 0);
        Ok((text, token_count, eval_ms))
    }

    async fn generate_hosted(
        &self,
        endpoint: &str,
        account_id: &str,
        api_token: &str,
        prompt: &str,
        model: &str,
    ) -> Result<(String, Option<u64>, Option<u64>)> {
        if api_token.trim().is_empty() {
            return Err(ProviderError::new(
                "hosted provider requires generation.hosted.api_token",
            )
            .into());
        }
        if account_id.trim().is_empty() {
            return Err(ProviderError::new(
                "hosted provider requires generation.hosted.account_id",
            )
            .into());
        }

        debug!(model, prompt_chars = prompt.len(), "calling hosted provider");
        let url = format!("{}/accounts/{}/ai/run/{}", endpoint, account_id, model);
        let json = self
            .post_json(
                self.client
                    .post(url)
                    .bearer_auth(api_token)
                    .json(&serde_json::json!({ "prompt": prompt })),
                "hosted",
            )
            .await?;

        if json.get("success").and_then(|s| s.as_bool()) == Some(false) {
            let errors = json
                .get("errors")
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(ProviderError::with_status(
                "hosted provider reported failure",
                200,
                errors,
            )
            .into());
        }

        let result = json.get("result");
        let text = match result.and_then(|r| r.get("response")).and_then(|r| r.as_str()) {
            Some(text) => text.to_string(),
            None => {
                return Err(ProviderError::with_status(
                    "hosted provider response has no text",
                    200,
                    json.to_string(),
                )
                .into())
            }
        };
        let token_count = result
            .and_then(|r| r.get("usage"))
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|v| v.as_u64());
        Ok((text, token_count, None))
    }
}
