//! LLM-backed root-cause writer
//!
//! Sends one incident report per call and accepts the reply only when it
//! carries the section headers the operator view expects. Two wire
//! dialects are supported: Anthropic messages and OpenAI-style chat
//! completions, picked from the endpoint URL.

use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::core::error::{FleetError, Result};

use super::context::IncidentContext;
use super::rca;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Four short sections fit comfortably
const MAX_TOKENS: u32 = 700;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dialect {
    Messages,
    ChatCompletions,
}

impl Dialect {
    fn for_endpoint(url: &str) -> Self {
        if url.contains("anthropic.com") {
            Dialect::Messages
        } else {
            Dialect::ChatCompletions
        }
    }

    fn body(self, model: &str, prompt: &str) -> Value {
        match self {
            Dialect::Messages => json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "system": rca::SYSTEM_PROMPT,
                "messages": [{ "role": "user", "content": prompt }],
            }),
            Dialect::ChatCompletions => json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    { "role": "system", "content": rca::SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }),
        }
    }

    /// The generated text inside a response body
    fn answer(self, body: &Value) -> Option<&str> {
        match self {
            Dialect::Messages => body["content"]
                .as_array()?
                .iter()
                .find(|block| block["type"] == "text" || block["type"].is_null())?["text"]
                .as_str(),
            Dialect::ChatCompletions => body["choices"][0]["message"]["content"].as_str(),
        }
    }
}

pub struct RcaClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dialect: Dialect,
}

impl RcaClient {
    pub fn new(api_key: String, endpoint: String, model: String) -> Self {
        let dialect = Dialect::for_endpoint(&endpoint);
        Self {
            http: Client::new(),
            endpoint,
            api_key,
            model,
            dialect,
        }
    }

    /// Replace the HTTP client, e.g. to set proxies or TLS roots
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Configure from `LLM_API_KEY` (required), `LLM_API_URL` and `LLM_MODEL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| FleetError::LlmError("LLM_API_KEY not set".into()))?;
        let endpoint = std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Ok(Self::new(api_key, endpoint, model))
    }

    /// Root-cause write-up for one incident, trimmed to its sections
    pub async fn analyse(&self, incident: &IncidentContext) -> Result<String> {
        let prompt = rca::build_prompt(incident);
        let response = self
            .request(&prompt)
            .send()
            .await
            .map_err(|e| FleetError::LlmError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FleetError::LlmError(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                detail.trim()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FleetError::LlmError(e.to_string()))?;
        let text = self
            .dialect
            .answer(&body)
            .ok_or_else(|| FleetError::LlmError("response carried no text".into()))?;

        rca::accept_answer(text).ok_or_else(|| {
            FleetError::LlmError(format!(
                "analysis for {} is missing its sections",
                incident.robot_id
            ))
        })
    }

    fn request(&self, prompt: &str) -> RequestBuilder {
        let post = self
            .http
            .post(&self.endpoint)
            .json(&self.dialect.body(&self.model, prompt));
        match self.dialect {
            Dialect::Messages => post
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Dialect::ChatCompletions => post.bearer_auth(&self.api_key),
        }
    }
}
