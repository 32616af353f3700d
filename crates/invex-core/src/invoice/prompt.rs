//! Extraction prompt construction.

use std::fmt::Write;

use crate::models::invoice::{FIELDS, LINE_ITEM_FIELDS};

const PREAMBLE: &str = "You are an expert invoice data extraction system. \
Extract the following information from this invoice:";

const RULES: [&str; 6] = [
    "Return ONLY valid JSON - no markdown, no explanations",
    "If a field is not found in the invoice, use null",
    "For numeric fields, extract only the number (no currency symbols)",
    "Dates must be in YYYY-MM-DD format",
    "Ensure line_items is always an array (can be empty [])",
    "Double-check your JSON is valid before responding",
];

/// Build the instruction prompt sent to the model for one document.
///
/// The output depends only on `raw_text`: the field list follows the schema
/// order and the text is embedded verbatim before the `JSON OUTPUT:` cue.
pub fn build_extraction_prompt(raw_text: &str) -> String {
    let mut prompt = String::with_capacity(raw_text.len() + 1536);

    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nREQUIRED FIELDS:\n");
    for (name, description) in FIELDS {
        let _ = writeln!(prompt, "- {}: {}", name, description);
        if name == "line_items" {
            for (item_name, item_description) in LINE_ITEM_FIELDS {
                let _ = writeln!(prompt, "  - {}: {}", item_name, item_description);
            }
        }
    }

    prompt.push_str("\nIMPORTANT RULES:\n");
    for (i, rule) in RULES.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, rule);
    }

    prompt.push_str("\nINVOICE TEXT:\n");
    prompt.push_str(raw_text);
    prompt.push_str("\n\nJSON OUTPUT:");
    prompt
}
