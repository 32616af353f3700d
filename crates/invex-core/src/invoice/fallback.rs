//! Offline extractor: a few regex rules, no network access.
//!
//! Used for test runs and as a degraded path when no provider credential is
//! configured. Only `invoice_number`, `total_amount` and `vendor_email` are
//! ever filled; everything else keeps its skeleton value.

use tracing::debug;

use crate::models::invoice::InvoiceRecord;

use super::patterns::{EMAIL, INVOICE_NUMBER, TOTAL_AMOUNT};
use super::{InvoiceExtractor, Result};

/// First invoice/reference number following an "invoice" or "inv" label.
pub fn find_invoice_number(text: &str) -> Option<String> {
    INVOICE_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First amount following a "total" or "amount due" label.
///
/// Thousands separators are dropped; a capture that still does not parse
/// (e.g. a lone `,`) yields `None`.
pub fn find_total_amount(text: &str) -> Option<f64> {
    let caps = TOTAL_AMOUNT.captures(text)?;
    caps.get(1)?
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()
}

/// First e-mail address anywhere in the text.
pub fn find_vendor_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Build a record from regex matches alone.
///
/// Never fails and always returns the full skeleton, so it can stand in for
/// a model response on any input.
pub fn extract_mock(raw_text: &str) -> InvoiceRecord {
    let record = InvoiceRecord {
        invoice_number: find_invoice_number(raw_text),
        total_amount: find_total_amount(raw_text),
        vendor_email: find_vendor_email(raw_text),
        ..InvoiceRecord::new()
    };

    debug!(
        "Fallback extraction: invoice_number={:?}, total_amount={:?}, vendor_email={:?}",
        record.invoice_number, record.total_amount, record.vendor_email
    );

    record
}

/// [`InvoiceExtractor`] backed by [`extract_mock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackExtractor;

impl FallbackExtractor {
    /// Create a new fallback extractor.
    pub fn new() -> Self {
        Self
    }
}

impl InvoiceExtractor for FallbackExtractor {
    fn name(&self) -> &str {
        "fallback"
    }

    fn extract_from_text(&self, text: &str) -> Result<InvoiceRecord> {
        Ok(extract_mock(text))
    }
}
