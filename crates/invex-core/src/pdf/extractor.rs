//! PDF text extraction using lopdf and pdf-extract.

use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    was_encrypted: bool,
    file_size_bytes: u64,
}

/// Basic document information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub num_pages: u32,
    /// Whether the file was encrypted (with an empty user password).
    pub is_encrypted: bool,
    pub file_size_bytes: u64,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub subject: Option<String>,
    pub title: Option<String>,
}

impl PdfMetadata {
    /// File size in megabytes, rounded to two decimals.
    pub fn file_size_mb(&self) -> f64 {
        (self.file_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            was_encrypted: false,
            file_size_bytes: 0,
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }

    fn info_entry(doc: &Document, info: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
        let value = info.get(key).ok()?;
        let (_, value) = doc.dereference(value).ok()?;
        match value {
            Object::String(bytes, _) => {
                let text = decode_pdf_string(bytes);
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            _ => None,
        }
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, else UTF-8
/// with lossy replacement.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        self.file_size_bytes = data.len() as u64;
        self.was_encrypted = doc.is_encrypted();

        // Only documents with an empty user password can be read
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf_extract needs the decrypted bytes
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        self.document()?;
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn metadata(&self) -> Result<PdfMetadata> {
        let doc = self.document()?;
        let mut metadata = PdfMetadata {
            num_pages: self.page_count(),
            is_encrypted: self.was_encrypted,
            file_size_bytes: self.file_size_bytes,
            ..PdfMetadata::default()
        };

        let info = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|info| doc.dereference(info).ok())
            .and_then(|(_, info)| info.as_dict().ok());

        if let Some(info) = info {
            metadata.author = Self::info_entry(doc, info, b"Author");
            metadata.creator = Self::info_entry(doc, info, b"Creator");
            metadata.producer = Self::info_entry(doc, info, b"Producer");
            metadata.subject = Self::info_entry(doc, info, b"Subject");
            metadata.title = Self::info_entry(doc, info, b"Title");
        }

        Ok(metadata)
    }
}
