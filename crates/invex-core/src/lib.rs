//! Core library for invoice field extraction.
//!
//! This crate provides:
//! - PDF ingestion (validation, text extraction, metadata)
//! - Prompt construction and model-backed extraction via OpenAI or Anthropic
//! - Response sanitizing and normalization into a fixed invoice schema
//! - A regex-based offline extractor for test runs and missing credentials

pub mod error;
pub mod invoice;
pub mod llm;
pub mod models;
pub mod pdf;

pub use error::{ConfigError, ExtractionError, InvexError, PdfError, Result};
pub use invoice::{
    build_extraction_prompt, clean_json_response, extract_mock, extract_with_backend, normalize,
    run_extractor, ExtractionClient, ExtractionResult, FallbackExtractor, InvoiceExtractor,
    ProviderExtractor,
};
pub use llm::{BackendError, CompletionBackend, Credentials, Provider, RequestSettings};
pub use models::config::{ExtractionConfig, InvexConfig, OutputConfig, OutputFormat, PdfConfig};
pub use models::invoice::{InvoiceRecord, LineItem};
pub use pdf::{extract_invoice_text, read_metadata, validate_pdf_file, PdfExtractor, PdfMetadata, PdfProcessor};
