use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Remote text summarization. Any error makes the analyzer fall back to
/// its local summary, so implementations need no retry logic of their own.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Shown in the report attribution line
    fn model_name(&self) -> &str;

    async fn summarize(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    /// `/api/generate`
    Ollama,
    /// `/v1/chat/completions`
    OpenAI,
}

impl LLMProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            LLMProvider::Ollama => "http://localhost:11434",
            LLMProvider::OpenAI => "https://api.openai.com",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            LLMProvider::Ollama => "llama3.2:3b",
            LLMProvider::OpenAI => "gpt-4o-mini",
        }
    }
}

/// Endpoint settings for the remote summarizer
#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        let provider = LLMProvider::Ollama;
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl LLMConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER").map(|p| p.to_lowercase()).as_deref() {
            Some("openai") => LLMProvider::OpenAI,
            _ => LLMProvider::Ollama,
        };

        let (url_key, model_key) = match provider {
            LLMProvider::Ollama => ("OLLAMA_URL", "OLLAMA_MODEL"),
            LLMProvider::OpenAI => ("OPENAI_BASE_URL", "OPENAI_MODEL"),
        };

        let api_key = match provider {
            LLMProvider::OpenAI => Some(
                lookup("OPENAI_API_KEY").context("OPENAI_API_KEY required for OpenAI provider")?,
            ),
            LLMProvider::Ollama => None,
        };

        let timeout_secs = lookup("LLM_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("LLM_TIMEOUT_SECS must be seconds, got {:?}", raw))
            })
            .transpose()?
            .unwrap_or(30);

        Ok(Self {
            provider,
            base_url: lookup(url_key).unwrap_or_else(|| provider.default_base_url().to_string()),
            model: lookup(model_key).unwrap_or_else(|| provider.default_model().to_string()),
            api_key,
            timeout_secs,
        })
    }
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Summarizer backed by an Ollama or OpenAI-compatible endpoint
pub struct LLMSummarizer {
    config: LLMConfig,
    client: Client,
}

impl LLMSummarizer {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    /// `None` unless `USE_LLM_SUMMARY` is `true` or `1` and the provider
    /// config is complete.
    pub fn from_env_optional() -> Option<Self> {
        let enabled = std::env::var("USE_LLM_SUMMARY")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        if !enabled {
            return None;
        }

        LLMConfig::from_env()
            .and_then(Self::new)
            .map_err(|e| warn!("Remote summaries disabled: {:#}", e))
            .ok()
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            "Summarize the following document excerpt in three to five sentences.\n\
             Keep the language of the original text. Do not add headings, bullet points or commentary.\n\n\
             Text:\n{}",
            text
        )
    }

    fn request_body(&self, prompt: &str) -> (String, Value) {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.provider {
            LLMProvider::Ollama => (
                format!("{}/api/generate", base),
                json!({
                    "model": self.config.model,
                    "prompt": prompt,
                    "stream": false,
                    "options": { "temperature": 0.3, "num_predict": 512 },
                }),
            ),
            LLMProvider::OpenAI => (
                format!("{}/v1/chat/completions", base),
                json!({
                    "model": self.config.model,
                    "messages": [
                        { "role": "system", "content": "You summarize documents concisely and faithfully." },
                        { "role": "user", "content": prompt },
                    ],
                    "temperature": 0.3,
                    "max_tokens": 512,
                }),
            ),
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Response> {
        debug!("Requesting summary from {}", url);

        let mut request = self.client.post(url).json(body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Summary request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Summary endpoint returned {}: {}", status, detail.trim());
        }
        Ok(response)
    }
}

#[async_trait]
impl Summarizer for LLMSummarizer {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let (url, body) = self.request_body(&self.build_prompt(text));
        let response = self.post(&url, &body).await?;

        let summary = match self.config.provider {
            LLMProvider::Ollama => {
                response
                    .json::<GenerateReply>()
                    .await
                    .context("Malformed generate reply")?
                    .response
            }
            LLMProvider::OpenAI => response
                .json::<ChatReply>()
                .await
                .context("Malformed chat completion reply")?
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .context("Chat completion had no choices")?,
        };

        let summary = summary.trim();
        if summary.is_empty() {
            anyhow::bail!("{} returned an empty summary", self.config.model);
        }
        Ok(summary.to_string())
    }
}
