//! HTTP-backed LLM client and the assistant seam adapter.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::warn;

use dealbot_agent::llm::LlmClient;
use dealbot_agent::runtime::AssistantRuntime;
use dealbot_core::config::{LlmConfig, LlmProvider};
use dealbot_whatsapp::router::{AssistantError, AssistantService};

pub struct HttpLlmClient {
    client: Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(client: Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| anyhow!("llm api key is not configured"))
    }

    async fn complete_once(&self, prompt: &str) -> Result<String> {
        match self.config.provider {
            LlmProvider::OpenAi => self.complete_openai(prompt).await,
            LlmProvider::Anthropic => self.complete_anthropic(prompt).await,
            LlmProvider::Ollama => self.complete_ollama(prompt).await,
        }
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let base = self.config.base_url.as_deref().unwrap_or("https://api.openai.com");
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let api_key = self.api_key()?.to_owned();
        let payload = self
            .post_json(&format!("{base}/v1/chat/completions"), &body, move |builder| {
                Ok(builder.bearer_auth(api_key))
            })
            .await?;

        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .context("completion response carried no message content")
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let base = self.config.base_url.as_deref().unwrap_or("https://api.anthropic.com");
        let body = json!({
            "model": self.config.model,
            "max_tokens": 512,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let api_key = self.api_key()?.to_owned();
        let payload = self
            .post_json(&format!("{base}/v1/messages"), &body, move |builder| {
                Ok(builder.header("x-api-key", api_key).header("anthropic-version", "2023-06-01"))
            })
            .await?;

        payload
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .context("completion response carried no content text")
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let base = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("llm base url is required for ollama"))?;
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        let payload =
            self.post_json(&format!("{base}/api/generate"), &body, |builder| Ok(builder)).await?;

        payload
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .context("completion response carried no response field")
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        decorate: impl FnOnce(reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder>,
    ) -> Result<Value> {
        let builder = decorate(self.client.post(url).json(body))?;
        let response = builder.send().await.context("llm request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("llm endpoint returned {status}: {detail}");
        }

        response.json().await.context("llm response was not valid json")
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.complete_once(prompt).await {
                Ok(completion) => return Ok(completion),
                Err(error) => {
                    warn!(event_name = "llm_attempt_failed", attempt, error = %error);
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("llm completion failed")))
    }
}

/// Bridges the agent runtime into the router's assistant seam.
pub struct RuntimeAssistant {
    runtime: AssistantRuntime,
}

impl RuntimeAssistant {
    pub fn new(runtime: AssistantRuntime) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl AssistantService for RuntimeAssistant {
    async fn answer(&self, question: &str) -> Result<String, AssistantError> {
        self.runtime.answer(question).await.map_err(|error| AssistantError(error.to_string()))
    }
}
