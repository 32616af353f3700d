//! Canonical invoice record produced by every extraction path.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Currency assumed when the document does not state one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Schema fields in canonical order, with the description given to the model.
pub const FIELDS: [(&str, &str); 16] = [
    ("vendor_name", "Company name of the seller"),
    ("vendor_address", "Full address of vendor"),
    ("vendor_email", "Vendor contact email"),
    ("vendor_phone", "Vendor contact phone"),
    ("invoice_number", "Invoice/reference number"),
    ("invoice_date", "Date of invoice (YYYY-MM-DD format)"),
    ("due_date", "Payment due date (YYYY-MM-DD format)"),
    ("customer_name", "Buyer/customer name"),
    ("customer_address", "Customer full address"),
    ("subtotal", "Subtotal before tax (numeric value only)"),
    ("tax_amount", "Tax amount (numeric value only)"),
    ("tax_rate", "Tax percentage (numeric value only)"),
    ("total_amount", "Final total (numeric value only)"),
    ("currency", "Currency code (USD, EUR, GBP, etc.)"),
    ("payment_terms", "Payment terms/conditions"),
    ("line_items", "Array of items, each with:"),
];

/// Line item keys requested from the model.
pub const LINE_ITEM_FIELDS: [(&str, &str); 4] = [
    ("description", "Item/service description"),
    ("quantity", "Quantity (numeric)"),
    ("unit_price", "Price per unit (numeric)"),
    ("total", "Line item total (numeric)"),
];

/// Fields stored as floating-point amounts.
pub const NUMERIC_FIELDS: [&str; 4] = ["subtotal", "tax_amount", "tax_rate", "total_amount"];

/// A normalized invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub vendor_name: Option<String>,
    pub vendor_address: Option<String>,
    pub vendor_email: Option<String>,
    pub vendor_phone: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub customer_name: Option<String>,
    pub customer_address: Option<String>,
    pub subtotal: Option<f64>,
    pub tax_amount: Option<f64>,
    pub tax_rate: Option<f64>,
    pub total_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,

    /// Keys outside the schema, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// One entry of `line_items`.
///
/// Usually a mapping with description, quantity, unit_price and total, but
/// the shape is open: vendor-specific keys and even non-mapping entries are
/// preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItem(Value);

impl LineItem {
    /// Wrap an arbitrary JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The entry's keys and values, if it is a mapping.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Whether the entry is a mapping.
    pub fn is_mapping(&self) -> bool {
        self.0.is_object()
    }

    /// Look up a key of a mapping entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields().and_then(|f| f.get(key))
    }

    /// The underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for LineItem {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Map<String, Value>> for LineItem {
    fn from(fields: Map<String, Value>) -> Self {
        Self(Value::Object(fields))
    }
}

impl Default for InvoiceRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceRecord {
    /// Empty record: every field null, USD currency, no line items.
    pub fn new() -> Self {
        Self {
            vendor_name: None,
            vendor_address: None,
            vendor_email: None,
            vendor_phone: None,
            invoice_number: None,
            invoice_date: None,
            due_date: None,
            customer_name: None,
            customer_address: None,
            subtotal: None,
            tax_amount: None,
            tax_rate: None,
            total_amount: None,
            currency: default_currency(),
            payment_terms: None,
            line_items: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Build a record from an already-normalized mapping.
    ///
    /// Text fields accept any scalar (numbers and booleans keep their JSON
    /// text, arrays and objects become compact JSON), amounts keep only
    /// numbers, and unknown keys land in [`InvoiceRecord::extra`].
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut text = |key: &str| fields.remove(key).and_then(value_to_text);
        let vendor_name = text("vendor_name");
        let vendor_address = text("vendor_address");
        let vendor_email = text("vendor_email");
        let vendor_phone = text("vendor_phone");
        let invoice_number = text("invoice_number");
        let invoice_date = text("invoice_date");
        let due_date = text("due_date");
        let customer_name = text("customer_name");
        let customer_address = text("customer_address");
        let currency = text("currency").unwrap_or_else(default_currency);
        let payment_terms = text("payment_terms");

        let mut amount = |key: &str| fields.remove(key).and_then(|v| v.as_f64());
        let subtotal = amount("subtotal");
        let tax_amount = amount("tax_amount");
        let tax_rate = amount("tax_rate");
        let total_amount = amount("total_amount");

        let line_items = match fields.remove("line_items") {
            Some(Value::Array(items)) => items.into_iter().map(LineItem::new).collect(),
            _ => Vec::new(),
        };

        Self {
            vendor_name,
            vendor_address,
            vendor_email,
            vendor_phone,
            invoice_number,
            invoice_date,
            due_date,
            customer_name,
            customer_address,
            subtotal,
            tax_amount,
            tax_rate,
            total_amount,
            currency,
            payment_terms,
            line_items,
            extra: fields,
        }
    }

    /// Scalar fields in schema order followed by extra keys.
    ///
    /// `line_items` is excluded; renderers write it separately.
    pub fn scalar_fields(&self) -> Vec<(String, Value)> {
        let text = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
        let amount = |v: Option<f64>| v.map(Value::from).unwrap_or(Value::Null);

        let mut rows = vec![
            ("vendor_name".to_string(), text(&self.vendor_name)),
            ("vendor_address".to_string(), text(&self.vendor_address)),
            ("vendor_email".to_string(), text(&self.vendor_email)),
            ("vendor_phone".to_string(), text(&self.vendor_phone)),
            ("invoice_number".to_string(), text(&self.invoice_number)),
            ("invoice_date".to_string(), text(&self.invoice_date)),
            ("due_date".to_string(), text(&self.due_date)),
            ("customer_name".to_string(), text(&self.customer_name)),
            ("customer_address".to_string(), text(&self.customer_address)),
            ("subtotal".to_string(), amount(self.subtotal)),
            ("tax_amount".to_string(), amount(self.tax_amount)),
            ("tax_rate".to_string(), amount(self.tax_rate)),
            ("total_amount".to_string(), amount(self.total_amount)),
            ("currency".to_string(), Value::String(self.currency.clone())),
            ("payment_terms".to_string(), text(&self.payment_terms)),
        ];
        rows.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        rows
    }

    /// Line items that are mappings, in document order.
    pub fn mapped_line_items(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.line_items.iter().filter_map(LineItem::fields)
    }

    /// Check the record for data-quality issues and return any found.
    ///
    /// Nothing here rejects the record; extraction already degraded bad
    /// values to nulls.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.invoice_number.as_deref().is_none_or(|s| s.trim().is_empty()) {
            issues.push("Missing invoice number".to_string());
        }

        if self.vendor_name.as_deref().is_none_or(|s| s.trim().is_empty()) {
            issues.push("Missing vendor name".to_string());
        }

        if self.total_amount.is_none() {
            issues.push("Missing total amount".to_string());
        }

        let invoice_date = self.check_date("invoice_date", &self.invoice_date, &mut issues);
        let due_date = self.check_date("due_date", &self.due_date, &mut issues);
        if let (Some(issued), Some(due)) = (invoice_date, due_date) {
            if due < issued {
                issues.push(format!("Due date ({}) is before invoice date ({})", due, issued));
            }
        }

        if let (Some(subtotal), Some(tax), Some(total)) =
            (self.subtotal, self.tax_amount, self.total_amount)
        {
            if (subtotal + tax - total).abs() > 0.01 {
                issues.push(format!(
                    "Subtotal plus tax ({:.2}) differs from total ({:.2})",
                    subtotal + tax,
                    total
                ));
            }
        }

        for (i, item) in self.line_items.iter().enumerate() {
            if !item.is_mapping() {
                issues.push(format!("Line item {} is not an object", i + 1));
            }
        }

        issues
    }

    fn check_date(
        &self,
        field: &str,
        value: &Option<String>,
        issues: &mut Vec<String>,
    ) -> Option<NaiveDate> {
        let raw = value.as_deref()?;
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                issues.push(format!("{} is not in YYYY-MM-DD format: {}", field, raw));
                None
            }
        }
    }
}

/// Text-typed fields are `Option<String>`, so a model that answers
/// `"invoice_number": 10042` yields `"10042"` in every output, JSON included.
/// The value itself is kept; only its JSON type changes.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_record_defaults() {
        let record = InvoiceRecord::new();
        assert_eq!(record.currency, "USD");
        assert!(record.line_items.is_empty());
        assert!(record.vendor_name.is_none());
        assert!(record.total_amount.is_none());
    }

    #[test]
    fn test_from_fields_keeps_extra_keys() {
        let record = InvoiceRecord::from_fields(fields(json!({
            "vendor_name": "Acme",
            "total_amount": 10.5,
            "po_number": "PO-77",
        })));

        assert_eq!(record.vendor_name.as_deref(), Some("Acme"));
        assert_eq!(record.total_amount, Some(10.5));
        assert_eq!(record.extra.get("po_number"), Some(&json!("PO-77")));
        assert!(!record.extra.contains_key("vendor_name"));
    }

    #[test]
    fn test_from_fields_currency_default() {
        let absent = InvoiceRecord::from_fields(Map::new());
        assert_eq!(absent.currency, "USD");

        let null = InvoiceRecord::from_fields(fields(json!({"currency": null})));
        assert_eq!(null.currency, "USD");

        let eur = InvoiceRecord::from_fields(fields(json!({"currency": "EUR"})));
        assert_eq!(eur.currency, "EUR");
    }

    #[test]
    fn test_from_fields_stringifies_scalar_text() {
        let record = InvoiceRecord::from_fields(fields(json!({
            "invoice_number": 10042,
            "vendor_phone": null,
        })));
        assert_eq!(record.invoice_number.as_deref(), Some("10042"));
        assert_eq!(record.vendor_phone, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["invoice_number"], json!("10042"));
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn test_from_fields_compound_text_is_compact_json() {
        let record = InvoiceRecord::from_fields(fields(json!({
            "vendor_address": ["1 Main St", "Springfield"],
            "payment_terms": true,
        })));
        assert_eq!(record.vendor_address.as_deref(), Some(r#"["1 Main St","Springfield"]"#));
        assert_eq!(record.payment_terms.as_deref(), Some("true"));
    }

    #[test]
    fn test_serialization_keeps_nulls_and_order() {
        let mut record = InvoiceRecord::new();
        record.vendor_name = Some("Zażółć Sp.".to_string());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["vendor_name"], "Zażółć Sp.");
        assert!(json["due_date"].is_null());
        assert_eq!(json["line_items"], json!([]));
        assert_eq!(json["currency"], "USD");
    }

    #[test]
    fn test_scalar_fields_order() {
        let mut record = InvoiceRecord::new();
        record.extra.insert("notes".to_string(), json!("thanks"));
        let names: Vec<String> = record.scalar_fields().into_iter().map(|(k, _)| k).collect();

        assert_eq!(names.first().map(String::as_str), Some("vendor_name"));
        assert_eq!(names[13], "currency");
        assert_eq!(names.last().map(String::as_str), Some("notes"));
        assert!(!names.contains(&"line_items".to_string()));
    }

    #[test]
    fn test_validate_complete_record() {
        let record = InvoiceRecord {
            vendor_name: Some("Acme".to_string()),
            invoice_number: Some("INV-1".to_string()),
            invoice_date: Some("2025-01-15".to_string()),
            due_date: Some("2025-02-15".to_string()),
            subtotal: Some(1000.0),
            tax_amount: Some(80.0),
            total_amount: Some(1080.0),
            ..InvoiceRecord::new()
        };
        assert!(record.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_issues() {
        let record = InvoiceRecord {
            invoice_date: Some("15/01/2025".to_string()),
            subtotal: Some(100.0),
            tax_amount: Some(8.0),
            total_amount: Some(120.0),
            line_items: vec![LineItem::new(json!("loose text"))],
            ..InvoiceRecord::new()
        };
        let issues = record.validate();

        assert!(issues.contains(&"Missing invoice number".to_string()));
        assert!(issues.contains(&"Missing vendor name".to_string()));
        assert!(issues.iter().any(|i| i.starts_with("invoice_date is not in YYYY-MM-DD")));
        assert!(issues.iter().any(|i| i.starts_with("Subtotal plus tax")));
        assert!(issues.contains(&"Line item 1 is not an object".to_string()));
    }

    #[test]
    fn test_validate_due_before_issue() {
        let record = InvoiceRecord {
            invoice_date: Some("2025-03-01".to_string()),
            due_date: Some("2025-02-01".to_string()),
            ..InvoiceRecord::new()
        };
        assert!(record.validate().iter().any(|i| i.starts_with("Due date")));
    }

    #[test]
    fn test_line_item_accessors() {
        let item = LineItem::from(fields(json!({"description": "Hosting", "total": 20})));
        assert!(item.is_mapping());
        assert_eq!(item.get("description"), Some(&json!("Hosting")));
        assert_eq!(LineItem::new(json!(3)).get("description"), None);
    }
}
