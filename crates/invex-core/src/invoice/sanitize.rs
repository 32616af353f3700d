//! Cleanup of raw model replies before JSON decoding.

use super::patterns::JSON_OBJECT_SPAN;

/// Strip markdown fences and surrounding chatter from a model reply.
///
/// The result is not guaranteed to be valid JSON. When the text contains a
/// `{`, everything from the first `{` to the last `}` is kept; nested or
/// multiple objects are not balanced.
pub fn clean_json_response(text: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned = cleaned.trim();

    match JSON_OBJECT_SPAN.find(cleaned) {
        Some(span) => span.as_str().to_string(),
        None => cleaned.to_string(),
    }
}
