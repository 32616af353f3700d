//! Model-backed extraction: prompt, one completion, sanitize, decode, normalize.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{json_kind, ExtractionError};
use crate::llm::{CompletionBackend, Credentials, Provider, RequestSettings};
use crate::models::config::ExtractionConfig;
use crate::models::invoice::InvoiceRecord;

use super::normalize::normalize;
use super::prompt::build_extraction_prompt;
use super::sanitize::clean_json_response;
use super::{InvoiceExtractor, Result};

/// Shortest trimmed text worth sending to a model.
pub const MIN_TEXT_LENGTH: usize = 10;

/// Characters of the cleaned reply quoted in decode errors.
pub const SNIPPET_LEN: usize = 200;

/// Connects to a provider and runs the extraction pipeline.
///
/// Holds no mutable state; one client can serve many documents.
#[derive(Debug, Clone, Default)]
pub struct ExtractionClient {
    credentials: Credentials,
    settings: HashMap<Provider, RequestSettings>,
}

impl ExtractionClient {
    /// Create a client using the given credentials and default settings.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            settings: HashMap::new(),
        }
    }

    /// Create a client from process environment credentials.
    pub fn from_env() -> Self {
        Self::new(Credentials::from_env())
    }

    /// Create a client with per-provider settings taken from configuration.
    pub fn from_config(credentials: Credentials, config: &ExtractionConfig) -> Self {
        Provider::ALL
            .into_iter()
            .fold(Self::new(credentials), |client, provider| {
                client.with_settings(provider, config.request_settings(provider))
            })
    }

    /// Override request settings for one provider.
    pub fn with_settings(mut self, provider: Provider, settings: RequestSettings) -> Self {
        self.settings.insert(provider, settings);
        self
    }

    /// Credentials this client authenticates with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Open a backend for `provider`.
    ///
    /// The credential is checked before the provider's availability in this
    /// build, so a missing key is reported even when the provider was
    /// compiled out.
    pub fn connect(&self, provider: Provider, model: Option<&str>) -> Result<Box<dyn CompletionBackend>> {
        let api_key = self
            .credentials
            .get(provider)
            .ok_or(ExtractionError::MissingCredential {
                provider,
                variable: provider.credential_var(),
            })?;

        let model = provider.resolve_model(model);
        let settings = self.settings.get(&provider).cloned().unwrap_or_default();

        match provider {
            Provider::OpenAi => open_openai(api_key, model, &settings),
            Provider::Anthropic => open_anthropic(api_key, model, &settings),
        }
    }

    /// Extract a record from raw document text with one model request.
    pub fn extract(
        &self,
        raw_text: &str,
        provider: Provider,
        model: Option<&str>,
    ) -> Result<InvoiceRecord> {
        check_text(raw_text)?;
        let backend = self.connect(provider, model)?;
        extract_with_backend(backend.as_ref(), raw_text)
    }

    /// Bind the client to a provider and model as an [`InvoiceExtractor`].
    pub fn bind(&self, provider: Provider, model: Option<&str>) -> Result<ProviderExtractor> {
        self.connect(provider, model).map(ProviderExtractor::new)
    }
}

#[cfg(feature = "openai")]
fn open_openai(api_key: &str, model: String, settings: &RequestSettings) -> Result<Box<dyn CompletionBackend>> {
    let backend = crate::llm::OpenAiBackend::new(api_key, model, settings)
        .map_err(|e| ExtractionError::ExtractionFailed { cause: e.to_string() })?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "openai"))]
fn open_openai(_api_key: &str, _model: String, _settings: &RequestSettings) -> Result<Box<dyn CompletionBackend>> {
    Err(Provider::OpenAi.dependency_unavailable())
}

#[cfg(feature = "anthropic")]
fn open_anthropic(api_key: &str, model: String, settings: &RequestSettings) -> Result<Box<dyn CompletionBackend>> {
    let backend = crate::llm::AnthropicBackend::new(api_key, model, settings)
        .map_err(|e| ExtractionError::ExtractionFailed { cause: e.to_string() })?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "anthropic"))]
fn open_anthropic(_api_key: &str, _model: String, _settings: &RequestSettings) -> Result<Box<dyn CompletionBackend>> {
    Err(Provider::Anthropic.dependency_unavailable())
}

fn check_text(raw_text: &str) -> Result<()> {
    let length = raw_text.trim().chars().count();
    if length < MIN_TEXT_LENGTH {
        return Err(ExtractionError::InputTooShort {
            length,
            minimum: MIN_TEXT_LENGTH,
        });
    }
    Ok(())
}

/// Run the extraction pipeline against an already-open backend.
pub fn extract_with_backend(backend: &dyn CompletionBackend, raw_text: &str) -> Result<InvoiceRecord> {
    check_text(raw_text)?;

    let prompt = build_extraction_prompt(raw_text);
    info!(
        "Requesting extraction from {} ({}), {} characters of text",
        backend.provider(),
        backend.model(),
        raw_text.len()
    );

    let reply = backend
        .complete(&prompt)
        .map_err(|e| ExtractionError::ExtractionFailed { cause: e.to_string() })?;
    debug!("Model replied with {} characters", reply.len());

    decode_response(&reply)
}

/// Sanitize, decode and normalize a raw model reply.
pub fn decode_response(reply: &str) -> Result<InvoiceRecord> {
    let cleaned = clean_json_response(reply);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| ExtractionError::InvalidModelOutput {
        message: e.to_string(),
        snippet: cleaned.chars().take(SNIPPET_LEN).collect(),
    })?;

    if !value.is_object() {
        return Err(ExtractionError::InvalidShape(json_kind(&value)));
    }

    normalize(value)
}

/// An [`ExtractionClient`] bound to one provider and model.
pub struct ProviderExtractor {
    backend: Box<dyn CompletionBackend>,
}

impl ProviderExtractor {
    /// Wrap an open backend.
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Model identifier requests are sent with.
    pub fn model(&self) -> &str {
        self.backend.model()
    }
}

impl InvoiceExtractor for ProviderExtractor {
    fn name(&self) -> &str {
        self.backend.provider().as_str()
    }

    fn extract_from_text(&self, text: &str) -> Result<InvoiceRecord> {
        extract_with_backend(self.backend.as_ref(), text)
    }
}
