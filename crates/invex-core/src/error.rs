//! Error types for the invex-core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::Provider;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF ingestion.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The input path does not exist.
    #[error("PDF file not found: {0}")]
    NotFound(PathBuf),

    /// The input path exists but is not a regular file.
    #[error("path is not a file: {0}")]
    NotAFile(PathBuf),

    /// The input file does not carry a `.pdf` extension.
    #[error("file is not a PDF: {0}")]
    NotPdf(PathBuf),

    /// The input file exceeds the configured size limit.
    #[error("PDF file too large: {size_mb:.2}MB (max {max_mb}MB)")]
    TooLarge { size_mb: f64, max_mb: f64 },

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is password-protected, provide an unencrypted version")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Too little text came out of the document.
    #[error(
        "no readable text found in PDF ({length} characters); \
         the invoice may be image-based or corrupted"
    )]
    NoText { length: usize },

    /// I/O error while reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the extraction pipeline.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Raw text is shorter than the minimum usable length.
    #[error("invoice text is empty or too short to parse ({length} < {minimum} characters)")]
    InputTooShort { length: usize, minimum: usize },

    /// Provider name outside the supported set.
    #[error("unsupported provider: {name} (supported providers: {supported})")]
    UnsupportedProvider { name: String, supported: String },

    /// The credential slot for the provider is empty.
    #[error("{variable} not set, provide an API key for {provider}")]
    MissingCredential { provider: Provider, variable: &'static str },

    /// The provider integration was compiled out of this build.
    #[error("{provider} support is not available in this build (enable the `{feature}` feature)")]
    DependencyUnavailable { provider: Provider, feature: &'static str },

    /// Transport, authentication or provider-side failure.
    #[error("model request failed: {cause}")]
    ExtractionFailed { cause: String },

    /// The cleaned model response is not valid JSON.
    #[error("failed to parse model response as JSON: {message}\nresponse: {snippet}")]
    InvalidModelOutput { message: String, snippet: String },

    /// The decoded model response is not a JSON object.
    #[error("model response must be a JSON object, got {0}")]
    InvalidShape(&'static str),

    /// The normalizer received something other than a mapping.
    #[error("invoice data must be a mapping, got {0}")]
    NotAMapping(&'static str),
}

/// Errors related to configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Output format outside the supported set.
    #[error("unsupported output format: {name} (supported formats: {supported})")]
    UnsupportedFormat { name: String, supported: String },

    /// Malformed configuration file.
    #[error("invalid configuration file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// I/O error when reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;

/// Name of a JSON value kind, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
