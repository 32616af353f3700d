//! Configuration structures for the extraction pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::{Provider, RequestSettings, DEFAULT_MAX_TOKENS};

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Model extraction configuration.
    pub extraction: ExtractionConfig,

    /// PDF ingestion configuration.
    pub pdf: PdfConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Model extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Provider used when none is given on the command line.
    pub provider: Provider,

    /// Model name or alias; the provider default when unset.
    pub model: Option<String>,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,

    /// HTTP timeout in seconds (no timeout when unset).
    pub timeout_secs: Option<u64>,

    /// Use the offline extractor instead of failing when no API key is set.
    pub fallback_without_credentials: bool,

    /// OpenAI API base URL override.
    pub openai_base_url: Option<String>,

    /// Anthropic API base URL override.
    pub anthropic_base_url: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: None,
            fallback_without_credentials: true,
            openai_base_url: None,
            anthropic_base_url: None,
        }
    }
}

impl ExtractionConfig {
    /// Request settings for a provider.
    pub fn request_settings(&self, provider: Provider) -> RequestSettings {
        let base_url = match provider {
            Provider::OpenAi => self.openai_base_url.clone(),
            Provider::Anthropic => self.anthropic_base_url.clone(),
        };
        RequestSettings {
            max_tokens: self.max_tokens,
            timeout: self.timeout_secs.map(Duration::from_secs),
            base_url,
        }
    }
}

/// PDF ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Largest accepted input file, in megabytes.
    pub max_file_size_mb: f64,

    /// Minimum trimmed text length for a document to be usable.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 5.0,
            min_text_length: 10,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Which data files to write.
    pub format: OutputFormat,

    /// Directory receiving the output files.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            directory: PathBuf::from("output"),
        }
    }
}

/// Data files to produce alongside the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `invoice_data.csv` (+ `line_items.csv`).
    #[default]
    Csv,
    /// `invoice_data.json`.
    Json,
    /// Both CSV and JSON.
    Both,
}

impl OutputFormat {
    /// Every supported format.
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Csv, OutputFormat::Json, OutputFormat::Both];

    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Both => "both",
        }
    }

    /// Whether CSV files are written.
    pub fn includes_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    /// Whether the JSON file is written.
    pub fn includes_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                name,
                supported: Self::ALL
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
