//! Chat-completion providers: anything that accepts a `[{role, content}]` list and
//! returns one assistant message. Implementations tolerate non-200/timeout by
//! surfacing an `anyhow::Error`; the adapter is the one place that turns that into
//! in-band `(None, None)`.

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

pub struct OllamaProvider {
    http: reqwest::Client,
    host: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(cfg: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: cfg.ollama_host.clone(),
            model: cfg.dream_model.clone(),
            temperature: cfg.llm_temp,
            timeout: Duration::from_secs(cfg.llm_timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessageOut>,
}

#[derive(Deserialize)]
struct OllamaMessageOut {
    content: String,
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let req = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system", content: system.to_string() },
                ChatMessage { role: "user", content: user.to_string() },
            ],
            stream: false,
            options: OllamaOptions { temperature: self.temperature },
        };

        let resp = self
            .http
            .post(format!("{}/api/chat", self.host))
            .timeout(self.timeout)
            .json(&req)
            .send()
            .await
            .context("ollama request")?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet: String = body.chars().take(800).collect();
            return Err(anyhow!("ollama {}: {}", status.as_u16(), snippet));
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&body).context("ollama json parse")?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// OpenRouter
// ---------------------------------------------------------------------------

pub struct OpenRouterProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    referer: Option<String>,
    title: String,
    max_tokens: u32,
    temperature: f64,
    timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(cfg: &Config) -> Result<Self> {
        let api_key = cfg
            .openrouter_api_key
            .clone()
            .ok_or_else(|| anyhow!("OPENROUTER_API_KEY not set"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: cfg.openrouter_base_url.clone(),
            api_key,
            model: cfg.dream_model.clone(),
            referer: cfg.openrouter_http_referer.clone(),
            title: cfg.openrouter_app_title.clone(),
            max_tokens: cfg.llm_max_tokens,
            temperature: cfg.llm_temp,
            timeout: Duration::from_secs(cfg.llm_timeout_secs),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageOut>,
}

#[derive(Deserialize)]
struct ChatMessageOut {
    content: String,
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system", content: system.to_string() },
                ChatMessage { role: "user", content: user.to_string() },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut http_req = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.api_key));
        if let Some(r) = &self.referer {
            http_req = http_req.header("HTTP-Referer", r);
        }
        http_req = http_req.header("X-Title", &self.title);

        let resp = http_req.json(&req).send().await.context("openrouter request")?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet: String = body.chars().take(800).collect();
            return Err(anyhow!("openrouter {}: {}", status.as_u16(), snippet));
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).context("openrouter json parse")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .unwrap_or_default())
    }
}

pub fn build_provider(cfg: &Config) -> Result<Box<dyn ChatProvider>> {
    match cfg.llm_provider {
        crate::config::LlmProvider::Ollama => Ok(Box::new(OllamaProvider::new(cfg))),
        crate::config::LlmProvider::OpenRouter => Ok(Box::new(OpenRouterProvider::new(cfg)?)),
    }
}
