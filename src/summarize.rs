//! Note summarization.
//!
//! Two providers sit behind [`Summarizer`]:
//! - [`ExtractiveSummarizer`]: takes the first sentence. No network, always available.
//! - [`ChatSummarizer`]: any OpenAI-compatible `/chat/completions` endpoint
//!   (DeepSeek by default).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SummaryConfig;

/// Longest first sentence kept verbatim by the extractive summarizer.
const EXTRACT_MAX_CHARS: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You summarize personal notes. Reply with one or two plain sentences \
capturing the key points. No preamble, no markdown.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("nothing to summarize")]
    EmptyInput,

    #[error("summary provider unreachable: {0}")]
    Unreachable(String),

    #[error("summary request timed out")]
    Timeout,

    #[error("summary request failed: {0}")]
    RequestFailed(String),

    #[error("could not parse summary response: {0}")]
    ParseError(String),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Pick a provider from configuration: the chat provider when an API key is
/// configured, the extractive one otherwise.
pub fn from_config(config: &SummaryConfig) -> Arc<dyn Summarizer> {
    match &config.api_key {
        Some(key) => {
            tracing::info!(
                base_url = %config.base_url,
                model = %config.model,
                "Using chat completion summarizer"
            );
            Arc::new(ChatSummarizer::new(
                config.base_url.clone(),
                Some(key.clone()),
                config.model.clone(),
            ))
        }
        None => {
            tracing::info!("No summary API key configured, using extractive summarizer");
            Arc::new(ExtractiveSummarizer)
        }
    }
}

/// First sentence of the text, cut at [`EXTRACT_MAX_CHARS`], followed by `...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    pub fn extract(text: &str) -> String {
        let first = text.trim().split('.').next().unwrap_or_default().trim();
        if first.chars().count() > EXTRACT_MAX_CHARS {
            let cut: String = first.chars().take(EXTRACT_MAX_CHARS).collect();
            format!("{cut}...")
        } else {
            format!("{first}...")
        }
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }
        Ok(Self::extract(text))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Summaries from an OpenAI-compatible chat completion API.
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatSummarizer {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    fn request(&self, text: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.3,
        };

        let req = self.client.post(url).timeout(REQUEST_TIMEOUT).json(&body);
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let response = self.request(text).send().await.map_err(|e| {
            if e.is_timeout() {
                SummarizeError::Timeout
            } else if e.is_connect() {
                SummarizeError::Unreachable(e.to_string())
            } else {
                SummarizeError::RequestFailed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let chat: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::ParseError(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SummarizeError::ParseError("no content in response".to_string()))
    }
}
