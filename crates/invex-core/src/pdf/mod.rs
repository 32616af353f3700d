//! PDF ingestion: input validation, text extraction and metadata.

mod extractor;

pub use extractor::{PdfExtractor, PdfMetadata};

use std::path::Path;

use tracing::{debug, info};

use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Document information of the loaded PDF.
    fn metadata(&self) -> Result<PdfMetadata>;
}

/// Check that `path` names an existing `.pdf` file within the size limit.
///
/// Returns the file size in bytes.
pub fn validate_pdf_file(path: &Path, max_size_mb: f64) -> Result<u64> {
    if !path.exists() {
        return Err(PdfError::NotFound(path.to_path_buf()));
    }

    if !path.is_file() {
        return Err(PdfError::NotAFile(path.to_path_buf()));
    }

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(PdfError::NotPdf(path.to_path_buf()));
    }

    let size = std::fs::metadata(path)?.len();
    let size_mb = size as f64 / BYTES_PER_MB;
    if size_mb > max_size_mb {
        return Err(PdfError::TooLarge {
            size_mb,
            max_mb: max_size_mb,
        });
    }

    Ok(size)
}

fn open(path: &Path, config: &PdfConfig) -> Result<PdfExtractor> {
    validate_pdf_file(path, config.max_file_size_mb)?;
    let data = std::fs::read(path)?;

    let mut extractor = PdfExtractor::new();
    extractor.load(&data)?;
    Ok(extractor)
}

/// Extract the full, trimmed text of an invoice PDF.
///
/// Fails with [`PdfError::NoText`] when fewer than `min_text_length`
/// characters remain, which usually means a scanned document.
pub fn extract_invoice_text(path: &Path, config: &PdfConfig) -> Result<String> {
    let extractor = open(path, config)?;
    info!("Extracting text from {} ({} pages)", path.display(), extractor.page_count());

    let text = extractor.extract_text()?.trim().to_string();
    let length = text.chars().count();
    if length < config.min_text_length {
        return Err(PdfError::NoText { length });
    }

    debug!("Extracted {} characters", length);
    Ok(text)
}

/// Read page count, encryption flag, size and Info entries of a PDF.
pub fn read_metadata(path: &Path, config: &PdfConfig) -> Result<PdfMetadata> {
    open(path, config)?.metadata()
}
