//! Anthropic messages API backend.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_message, http_client, transport_error, BackendError, CompletionBackend, Provider, RequestSettings};

/// Public Anthropic API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Backend for the Anthropic messages API.
pub struct AnthropicBackend {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicBackend {
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

    pub(crate) fn request<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }
}

/// Pull the first text block out of a messages response body.
pub(crate) fn parse_response(body: &str) -> Result<String, BackendError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Response(e.to_string()))?;

    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| BackendError::Response("message has no text content".to_string()))
}

impl CompletionBackend for AnthropicBackend {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        debug!("POST {} (model {})", url, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
