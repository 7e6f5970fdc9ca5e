//! Model service: the [`ChatModel`] seam and an OpenAI-compatible client.
//!
//! The pipeline only ever sees `&dyn ChatModel`, so tests drive it with a
//! scripted double and the binary plugs in [`OpenAiChat`]. Any endpoint that
//! speaks the `/chat/completions` protocol works (OpenAI, Azure-style proxies,
//! Ollama, vLLM, LiteLLM).

use crate::error::Pdf2AnkiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the service for a JSON-object response.
    pub json_response: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            json_response: false,
        }
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }

    pub fn json_response(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// Failure of a single model call. Every variant is treated as retryable.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a chat completion.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The completion carried no text.
    #[error("response contained no completion text")]
    EmptyResponse,
}

/// A chat-completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `request` and return the text of the first completion.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiChat {
    /// Build a client for `api_base` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        api_key: impl Into<String>,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, Pdf2AnkiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Pdf2AnkiError::ClientInit(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: completions_endpoint(api_base),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        debug!(
            "POST {} model={} messages={} json={}",
            self.endpoint,
            request.model,
            request.messages.len(),
            request.json_response
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        parse_completion(&body)
    }
}

/// `{base}/chat/completions`, tolerating a trailing slash on the base.
fn completions_endpoint(api_base: &str) -> String {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
}

/// Serialise a request into the wire format.
fn request_body(request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages,
    });
    if let Some(n) = request.max_tokens {
        body["max_tokens"] = json!(n);
    }
    if let Some(t) = request.temperature {
        body["temperature"] = json!(t);
    }
    if request.json_response {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Pull the first completion's text out of a response body.
fn parse_completion(body: &str) -> Result<String, ChatError> {
    let completion: Completion =
        serde_json::from_str(body).map_err(|e| ChatError::Decode(e.to_string()))?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(ChatError::EmptyResponse)
}

/// Keep error bodies short enough for a log line.
fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 300;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}\u{2026}", &body[..idx]),
        None => body.to_string(),
    }
}
