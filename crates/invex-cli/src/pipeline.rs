//! Shared pipeline plumbing for the `process` and `batch` commands.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use invex_core::error::ExtractionError;
use invex_core::{
    extract_invoice_text, run_extractor, ExtractionClient, ExtractionConfig, ExtractionResult,
    FallbackExtractor, InvexConfig, InvoiceExtractor, Provider,
};

/// Per-user configuration file managed by `invex config`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// Load the configuration for a run.
///
/// An explicit `--config` path must exist; without one the per-user file is
/// read when present, defaults otherwise.
pub fn load_config(path: Option<&str>) -> anyhow::Result<InvexConfig> {
    resolve_config(path.map(Path::new), &default_config_path())
}

fn resolve_config(explicit: Option<&Path>, user_file: &Path) -> anyhow::Result<InvexConfig> {
    match explicit {
        Some(path) => Ok(InvexConfig::from_file(path)?),
        None if user_file.is_file() => {
            info!("Using configuration from {}", user_file.display());
            Ok(InvexConfig::from_file(user_file)?)
        }
        None => Ok(InvexConfig::default()),
    }
}

/// Pick the extractor for a run.
///
/// Test mode always uses the offline extractor. Without a credential for
/// `provider` the offline extractor is used as well when the configuration
/// allows it; otherwise the missing credential is an error.
pub fn select_extractor(
    client: &ExtractionClient,
    config: &ExtractionConfig,
    provider: Provider,
    model: Option<&str>,
    test_mode: bool,
) -> Result<Box<dyn InvoiceExtractor>, ExtractionError> {
    if test_mode {
        info!("Test mode enabled, using fallback extractor");
        return Ok(Box::new(FallbackExtractor::new()));
    }

    if !client.credentials().has(provider) && config.fallback_without_credentials {
        warn!(
            "No {} API key found ({} not set), falling back to offline extraction",
            provider,
            provider.credential_var()
        );
        return Ok(Box::new(FallbackExtractor::new()));
    }

    let extractor = client.bind(provider, model)?;
    info!("Using {} model {}", provider, extractor.model());
    Ok(Box::new(extractor))
}

/// Extract the text of one PDF and run `extractor` over it.
pub fn process_file(
    path: &Path,
    config: &InvexConfig,
    extractor: &dyn InvoiceExtractor,
) -> anyhow::Result<ExtractionResult> {
    let text = extract_invoice_text(path, &config.pdf)?;
    info!("Extracted {} characters from {}", text.len(), path.display());
    Ok(run_extractor(extractor, &text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invex_core::Credentials;

    #[test]
    fn test_test_mode_uses_fallback() {
        let client = ExtractionClient::new(Credentials::new().with_key(Provider::OpenAi, "sk-test"));
        let extractor = select_extractor(&client, &ExtractionConfig::default(), Provider::OpenAi, None, true).unwrap();
        assert_eq!(extractor.name(), "fallback");
    }

    #[test]
    fn test_missing_credential_falls_back() {
        let client = ExtractionClient::new(Credentials::new());
        let extractor =
            select_extractor(&client, &ExtractionConfig::default(), Provider::Anthropic, None, false).unwrap();
        assert_eq!(extractor.name(), "fallback");
    }

    #[test]
    fn test_missing_credential_without_fallback() {
        let client = ExtractionClient::new(Credentials::new());
        let config = ExtractionConfig {
            fallback_without_credentials: false,
            ..ExtractionConfig::default()
        };

        let err = select_extractor(&client, &config, Provider::OpenAi, None, false)
            .err()
            .unwrap();
        assert!(matches!(err, ExtractionError::MissingCredential { .. }));
    }

    #[test]
    fn test_credential_selects_provider() {
        let client = ExtractionClient::new(Credentials::new().with_key(Provider::OpenAi, "sk-test"));
        let extractor = select_extractor(&client, &ExtractionConfig::default(), Provider::OpenAi, None, false).unwrap();
        assert_eq!(extractor.name(), "openai");
    }

    #[test]
    fn test_resolve_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_config(None, &dir.path().join("config.json")).unwrap();
        assert_eq!(config.extraction.provider, Provider::OpenAi);
        assert!(load_config(Some("/nonexistent/invex.json")).is_err());
    }

    #[test]
    fn test_resolve_config_reads_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let user_file = dir.path().join("config.json");
        let mut saved = InvexConfig::default();
        saved.extraction.provider = Provider::Anthropic;
        saved.save(&user_file).unwrap();

        let config = resolve_config(None, &user_file).unwrap();
        assert_eq!(config.extraction.provider, Provider::Anthropic);

        let explicit = dir.path().join("explicit.json");
        InvexConfig::default().save(&explicit).unwrap();
        let config = resolve_config(Some(&explicit), &user_file).unwrap();
        assert_eq!(config.extraction.provider, Provider::OpenAi);
    }
}
