use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{LlmBackend, LlmSettings};

#[derive(Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

#[derive(Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
}

#[derive(Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ChatMessageResponse,
}

#[derive(Deserialize)]
pub struct ChatMessageResponse {
    pub content: String,
}

/// Text-completion client for the configured model backend.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("build model HTTP client")?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Send `prompt` and return the model's raw text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        match self.settings.backend {
            LlmBackend::Ollama => self.call_ollama(prompt).await,
            LlmBackend::OpenAi => self.call_chat_completions(prompt).await,
        }
    }

    async fn call_ollama(&self, prompt: &str) -> Result<String> {
        let req = GenerateRequest {
            model: &self.settings.model,
            prompt,
            stream: false,
        };

        let resp = self
            .http
            .post(&self.settings.url)
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        Ok(resp.response)
    }

    async fn call_chat_completions(&self, prompt: &str) -> Result<String> {
        let req = ChatCompletionRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            messages: vec![ChatMessage {
                role: "system",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(&self.settings.url)
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletionResponse>()
            .await?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .context("model returned no choices")?;
        Ok(choice.message.content)
    }
}
