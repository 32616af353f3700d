//! Normalization of decoded model output into an [`InvoiceRecord`].

use serde_json::{Map, Value};

use crate::error::{json_kind, ExtractionError};
use crate::models::invoice::{InvoiceRecord, NUMERIC_FIELDS};

use super::Result;

/// Normalize a decoded candidate into a record.
///
/// Fails with [`ExtractionError::NotAMapping`] unless the candidate is a
/// JSON object. Field coercion never fails; see [`normalize_fields`].
pub fn normalize(candidate: Value) -> Result<InvoiceRecord> {
    match candidate {
        Value::Object(mut fields) => {
            normalize_fields(&mut fields);
            Ok(InvoiceRecord::from_fields(fields))
        }
        other => Err(ExtractionError::NotAMapping(json_kind(&other))),
    }
}

/// Coerce the known fields of a mapping in place.
///
/// - `line_items` that is present but not an array becomes `[]`.
/// - Present, non-null amounts are parsed as numbers with `,` removed;
///   anything unparsable becomes null.
///
/// Every other key is left untouched.
pub fn normalize_fields(fields: &mut Map<String, Value>) {
    if let Some(items) = fields.get_mut("line_items") {
        if !items.is_array() {
            *items = Value::Array(Vec::new());
        }
    }

    for name in NUMERIC_FIELDS {
        if let Some(value) = fields.get_mut(name) {
            if !value.is_null() {
                *value = coerce_number(value).map(Value::from).unwrap_or(Value::Null);
            }
        }
    }
}

/// Parse a JSON scalar as a finite float.
///
/// Numbers and numeric strings (thousands separators `,` allowed, surrounding
/// whitespace ignored) parse; booleans, arrays, objects and non-finite values
/// do not.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };

    text.replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_numeric_strings_coerced() {
        let record = normalize(json!({
            "subtotal": "1,000.00",
            "tax_amount": "80",
            "tax_rate": 8,
            "total_amount": " 1,080.50 ",
        }))
        .unwrap();

        assert_eq!(record.subtotal, Some(1000.0));
        assert_eq!(record.tax_amount, Some(80.0));
        assert_eq!(record.tax_rate, Some(8.0));
        assert_eq!(record.total_amount, Some(1080.5));
    }

    #[test]
    fn test_invalid_numbers_become_null() {
        let record = normalize(json!({
            "subtotal": "N/A",
            "tax_amount": true,
            "tax_rate": "inf",
            "total_amount": {"value": 3},
        }))
        .unwrap();

        assert_eq!(record.subtotal, None);
        assert_eq!(record.tax_amount, None);
        assert_eq!(record.tax_rate, None);
        assert_eq!(record.total_amount, None);
    }

    #[test]
    fn test_line_items_coercion() {
        let null_items = normalize(json!({"line_items": null})).unwrap();
        assert!(null_items.line_items.is_empty());

        let text_items = normalize(json!({"line_items": "two widgets"})).unwrap();
        assert!(text_items.line_items.is_empty());

        let items = normalize(json!({"line_items": [{"description": "Widget"}, 7]})).unwrap();
        assert_eq!(items.line_items.len(), 2);
        assert_eq!(items.line_items[0].get("description"), Some(&json!("Widget")));
        assert_eq!(items.line_items[1].as_value(), &json!(7));
    }

    #[test]
    fn test_non_mapping_rejected() {
        for candidate in [json!([1, 2]), json!("text"), json!(null), json!(12)] {
            assert!(matches!(
                normalize(candidate),
                Err(ExtractionError::NotAMapping(_))
            ));
        }

        let err = normalize(json!([])).unwrap_err();
        assert_eq!(err.to_string(), "invoice data must be a mapping, got an array");
    }

    #[test]
    fn test_in_place_pass_leaves_other_fields() {
        let mut fields = match json!({
            "vendor_name": "Acme",
            "invoice_date": "2025-01-15",
            "total_amount": "12",
            "notes": "pay on time",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        normalize_fields(&mut fields);

        assert_eq!(fields["vendor_name"], json!("Acme"));
        assert_eq!(fields["invoice_date"], json!("2025-01-15"));
        assert_eq!(fields["total_amount"], json!(12.0));
        assert_eq!(fields["notes"], json!("pay on time"));
        assert!(!fields.contains_key("line_items"));
    }

    #[test]
    fn test_absent_fields_default() {
        let record = normalize(json!({})).unwrap();
        assert_eq!(record, InvoiceRecord::new());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!("1,234.5")), Some(1234.5));
        assert_eq!(coerce_number(&json!(-3)), Some(-3.0));
        assert_eq!(coerce_number(&json!("1e3")), Some(1000.0));
        assert_eq!(coerce_number(&json!("$12")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }
}
