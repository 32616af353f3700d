//! Invoice field extraction.
//!
//! Two paths produce an [`InvoiceRecord`] from raw document text:
//! - [`client`] asks a language model (prompt, one request, sanitize, decode,
//!   normalize).
//! - [`fallback`] applies a handful of regex rules offline.

pub mod client;
pub mod fallback;
pub mod normalize;
pub mod patterns;
pub mod prompt;
pub mod sanitize;

use std::time::Instant;

use tracing::{debug, info};

pub use client::{decode_response, extract_with_backend, ExtractionClient, ProviderExtractor};
pub use fallback::{extract_mock, FallbackExtractor};
pub use normalize::{coerce_number, normalize, normalize_fields};
pub use prompt::build_extraction_prompt;
pub use sanitize::clean_json_response;

use crate::error::ExtractionError;
use crate::models::invoice::InvoiceRecord;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for invoice field extractors.
pub trait InvoiceExtractor {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Extract invoice data from plain text.
    fn extract_from_text(&self, text: &str) -> Result<InvoiceRecord>;
}

/// Result of running an extractor over one document.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted invoice data.
    pub record: InvoiceRecord,
    /// Name of the extractor that produced the record.
    pub extractor: String,
    /// Data-quality issues found in the record.
    pub warnings: Vec<String>,
    /// Extraction time in milliseconds.
    pub processing_time_ms: u64,
}

/// Run `extractor` over `text`, timing it and collecting validation warnings.
pub fn run_extractor(extractor: &dyn InvoiceExtractor, text: &str) -> Result<ExtractionResult> {
    let start = Instant::now();
    info!("Extracting invoice fields with {} extractor", extractor.name());

    let record = extractor.extract_from_text(text)?;
    let warnings = record.validate();
    for warning in &warnings {
        debug!("Validation: {}", warning);
    }

    Ok(ExtractionResult {
        record,
        extractor: extractor.name().to_string(),
        warnings,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}
