//! Regex patterns shared by the sanitizer and the fallback extractor.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Greedy first `{` to last `}` span, across lines
    pub static ref JSON_OBJECT_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();

    // "Invoice #INV-001", "INV: 2024-17"
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)(?:invoice|inv)[#\s:]*([A-Z0-9-]+)"
    ).unwrap();

    // "Total: $1,234.50", "Amount due 99"
    pub static ref TOTAL_AMOUNT: Regex = Regex::new(
        r"(?i)(?:total|amount due)[:\s]*\$?\s*([\d,]+\.?\d*)"
    ).unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();
}
