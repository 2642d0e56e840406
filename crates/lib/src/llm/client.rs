//! OpenAI-compatible chat completions client (`POST {base}/chat/completions`).

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::envelope::extract_text;
use super::rate_limit::{parse_retry_after_body, parse_retry_after_header};
use crate::config::ProviderConfig;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// One chat message (role + content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Everything about a call except the model id, which the invoker varies.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A completed call: generated text, or a rate-limit signal with an optional hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Text(String),
    RateLimited { retry_after_secs: Option<u64> },
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat api error: {status} {body}")]
    Api { status: u16, body: String },
}

/// A text-generation endpoint. Implemented by [`ChatClient`]; tests plug in scripted backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One call to `model` bounded by `timeout`.
    async fn complete(
        &self,
        model: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatReply, ChatError>;

    /// False when the backend cannot possibly succeed (e.g. no API key); the invoker then skips
    /// network calls entirely.
    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

/// Client for an OpenAI-compatible chat completions API with bearer-token auth.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(provider: &ProviderConfig) -> Self {
        Self::new(Some(provider.base_url.clone()), provider.api_key.clone())
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(
        &self,
        model: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatReply, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionBody {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let mut req = self.client.post(&url).timeout(timeout).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        let status = res.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_hint = res
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after_header);
            let body = res.text().await.unwrap_or_default();
            let retry_after_secs = header_hint.or_else(|| parse_retry_after_body(&body));
            return Ok(ChatReply::RateLimited { retry_after_secs });
        }
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body: body.chars().take(1000).collect(),
            });
        }

        let text = res.text().await?;
        let content = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(envelope) => extract_text(&envelope),
            Err(_) => {
                log::debug!("model {} returned a non-JSON body; using it as text", model);
                text
            }
        };
        Ok(ChatReply::Text(content))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
