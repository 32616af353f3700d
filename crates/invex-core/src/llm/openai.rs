//! OpenAI chat completions backend.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_message, http_client, transport_error, BackendError, CompletionBackend, Provider, RequestSettings};

/// Public OpenAI API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Backend for the OpenAI chat completions API.
pub struct OpenAiBackend {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiBackend {
    /// Create a backend for `model` authenticated with `api_key`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        settings: &RequestSettings,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            http: http_client(settings)?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens: settings.max_tokens,
        })
    }

    pub(crate) fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }
}

/// Pull the first choice's text out of a chat completion body.
pub(crate) fn parse_response(body: &str) -> Result<String, BackendError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Response(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| BackendError::Response("completion has no message content".to_string()))
}

impl CompletionBackend for OpenAiBackend {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("POST {} (model {})", url, self.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .map_err(transport_error)?;

        if !status.is_success() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_response(&body)
    }
}
