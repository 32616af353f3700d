//! Language model providers.
//!
//! The extraction client only talks to the [`CompletionBackend`] trait, so
//! provider specifics stay in this module:
//! - `openai` - OpenAI chat completions (feature `openai`)
//! - `anthropic` - Anthropic messages API (feature `anthropic`)

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "openai")]
pub mod openai;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ExtractionError;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicBackend;
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

/// Default upper bound on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// Anthropic Claude messages.
    Anthropic,
}

impl Provider {
    /// Every supported provider.
    pub const ALL: [Provider; 2] = [Provider::OpenAi, Provider::Anthropic];

    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    /// Name of the environment variable holding this provider's API key.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Cargo feature that compiles this provider in.
    pub fn feature(&self) -> &'static str {
        self.as_str()
    }

    /// Error reported when this provider was compiled out of the build.
    pub fn dependency_unavailable(&self) -> ExtractionError {
        ExtractionError::DependencyUnavailable {
            provider: *self,
            feature: self.feature(),
        }
    }

    /// Model used when none is requested.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }

    /// Resolve a model alias to the provider's model identifier.
    ///
    /// Known short names map to pinned identifiers, anything else is passed
    /// through verbatim and `None` selects [`Provider::default_model`].
    pub fn resolve_model(&self, model: Option<&str>) -> String {
        let Some(name) = model.map(str::trim).filter(|m| !m.is_empty()) else {
            return self.default_model().to_string();
        };

        let alias = match (self, name) {
            (Provider::OpenAi, "gpt-4") => Some("gpt-4"),
            (Provider::OpenAi, "gpt-4-turbo") => Some("gpt-4-turbo-preview"),
            (Provider::OpenAi, "gpt-3.5-turbo") => Some("gpt-3.5-turbo"),
            (Provider::Anthropic, "claude-3-5-sonnet") => Some("claude-3-5-sonnet-20241022"),
            (Provider::Anthropic, "claude-3-opus") => Some("claude-3-opus-20240229"),
            (Provider::Anthropic, "claude-3-sonnet") => Some("claude-3-sonnet-20240229"),
            _ => None,
        };

        alias.unwrap_or(name).to_string()
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| ExtractionError::UnsupportedProvider {
                name,
                supported: Self::supported_list(),
            })
    }
}

/// Read-only credential lookup, one slot per provider.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<Provider, String>,
}

impl Credentials {
    /// Create an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every provider's slot from the process environment.
    pub fn from_env() -> Self {
        let keys = Provider::ALL
            .into_iter()
            .filter_map(|p| std::env::var(p.credential_var()).ok().map(|k| (p, k)))
            .collect();
        Self { keys }
    }

    /// Set the key for a provider.
    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    /// API key for a provider; blank values count as absent.
    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys
            .get(&provider)
            .map(String::as_str)
            .filter(|k| !k.trim().is_empty())
    }

    /// Whether a usable key is configured for the provider.
    pub fn has(&self, provider: Provider) -> bool {
        self.get(provider).is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<&str> = Provider::ALL
            .iter()
            .filter(|p| self.has(**p))
            .map(|p| p.as_str())
            .collect();
        f.debug_struct("Credentials")
            .field("configured", &configured)
            .finish()
    }
}

/// Request parameters shared by all providers.
#[derive(Debug, Clone)]
pub struct RequestSettings {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Whole-request HTTP timeout; `None` disables it entirely.
    pub timeout: Option<Duration>,
    /// Override for the provider's API base URL.
    pub base_url: Option<String>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
            base_url: None,
        }
    }
}

/// Errors produced by a provider backend.
///
/// These never leave the extraction client; they are folded into
/// [`ExtractionError::ExtractionFailed`].
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The provider's response could not be interpreted.
    #[error("unexpected response: {0}")]
    Response(String),
}

/// A model that turns one prompt into one text completion.
pub trait CompletionBackend: Send + Sync {
    /// Provider this backend talks to.
    fn provider(&self) -> Provider;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send a single prompt and return the raw text of the reply.
    fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Build a blocking HTTP client.
///
/// The timeout is always set: the blocking client otherwise applies its own
/// 30 second default, and `None` has to reach it to disable that.
#[cfg(any(feature = "openai", feature = "anthropic"))]
pub(crate) fn http_client(settings: &RequestSettings) -> Result<reqwest::blocking::Client, BackendError> {
    reqwest::blocking::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(transport_error)
}

/// Transport failure carrying the full `source()` chain, e.g.
/// `error sending request: operation timed out`.
#[cfg(any(feature = "openai", feature = "anthropic"))]
pub(crate) fn transport_error(error: reqwest::Error) -> BackendError {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    BackendError::Transport(message)
}

/// Pull a human-readable message out of a provider error body.
///
/// Both providers wrap errors as `{"error": {"message": ...}}`.
#[cfg(any(feature = "openai", feature = "anthropic"))]
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
