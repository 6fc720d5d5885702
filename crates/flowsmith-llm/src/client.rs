use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::types::*;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Something that can answer a chat-completion request. Implemented by
/// [`LlmClient`] and by scripted backends in tests.
pub trait ChatBackend {
    fn model_name(&self) -> &str;

    fn chat(&self, messages: Vec<Message>) -> impl Future<Output = Result<ChatResponse>> + Send;
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
    /// Sent with every request; some proxies require their own headers.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.7),
            max_tokens: Some(4000),
            timeout: Duration::from_secs(60),
            extra_headers: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Defaults overlaid with `OPENAI_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = var("OPENAI_API_KEY");
        if let Some(base_url) = var("OPENAI_API_BASE_URL").or_else(|| var("OPENAI_BASE_URL")) {
            info!("Using model service base URL: {}", base_url);
            config.base_url = base_url;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(raw) = var("OPENAI_PROXY_HEADERS") {
            match parse_headers(&raw) {
                Ok(headers) => config.extra_headers = headers,
                Err(e) => warn!("Ignoring OPENAI_PROXY_HEADERS: {}", e),
            }
        }

        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Header map from a JSON object; non-string values are stringified.
fn parse_headers(raw: &str) -> Result<BTreeMap<String, String>> {
    let object: BTreeMap<String, Value> = serde_json::from_str(raw)?;
    Ok(object
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("LLM request to {}: {} messages", url, request.messages.len());

        let mut req_builder = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }
        for (name, value) in &self.config.extra_headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        let response = req_builder.send().await.map_err(ChatError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status.as_u16(), &error_text).into());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        info!(
            "LLM response: finish_reason={:?}, usage={:?}",
            chat_response
                .choices
                .first()
                .and_then(|c| c.finish_reason.as_ref()),
            chat_response.usage.map(|u| u.total_tokens)
        );

        Ok(chat_response)
    }
}

impl ChatBackend for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn chat(&self, messages: Vec<Message>) -> impl Future<Output = Result<ChatResponse>> + Send {
        LlmClient::chat(self, messages)
    }
}

/// Service message from an error body, or the raw body when it is not the
/// usual `{"error": {"message": ...}}` shape.
pub(crate) fn service_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
