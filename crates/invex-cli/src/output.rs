//! Output writers: CSV, JSON, text summary and the error report.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use invex_core::error::{ConfigError, ExtractionError, PdfError};
use invex_core::{InvexError, InvoiceRecord, OutputFormat};

const RULE: &str = "==================================================";

pub const INVOICE_CSV: &str = "invoice_data.csv";
pub const LINE_ITEMS_CSV: &str = "line_items.csv";
pub const INVOICE_JSON: &str = "invoice_data.json";
pub const SUMMARY_TXT: &str = "summary.txt";
pub const ERROR_LOG: &str = "error_log.txt";

/// Render a float the way the rest of the output expects: whole values keep
/// one decimal (`1080.0`), others use the shortest exact form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

/// Text of a JSON value for a CSV cell; null is empty.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) if n.is_f64() => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// `vendor_name` -> `Vendor Name`.
pub fn field_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len());
    let mut prev_alphabetic = false;
    for c in key.replace('_', " ").chars() {
        if prev_alphabetic {
            label.extend(c.to_lowercase());
        } else {
            label.extend(c.to_uppercase());
        }
        prev_alphabetic = c.is_alphabetic();
    }
    label
}

/// Write `invoice_data.csv` and, when any mapping line item has keys,
/// `line_items.csv` next to it. Returns whether line items were written.
pub fn write_csv(record: &InvoiceRecord, path: &Path) -> anyhow::Result<bool> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Field", "Value"])?;
    for (key, value) in record.scalar_fields() {
        wtr.write_record([field_label(&key), cell(&value)])?;
    }
    wtr.flush()?;

    let columns: BTreeSet<&str> = record
        .mapped_line_items()
        .flat_map(|item| item.keys().map(String::as_str))
        .collect();
    if columns.is_empty() {
        return Ok(false);
    }

    let items_path = path.with_file_name(LINE_ITEMS_CSV);
    let mut wtr = csv::Writer::from_path(&items_path)?;
    wtr.write_record(&columns)?;
    for item in record.mapped_line_items() {
        wtr.write_record(columns.iter().map(|c| item.get(*c).map(cell).unwrap_or_default()))?;
    }
    wtr.flush()?;

    debug!("Wrote {} line items to {}", record.line_items.len(), items_path.display());
    Ok(true)
}

/// Write the record as pretty-printed JSON.
pub fn write_json(record: &InvoiceRecord, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    Ok(())
}

fn text_or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

fn amount_or(value: Option<f64>, default: &str) -> String {
    value.map(format_number).unwrap_or_else(|| default.to_string())
}

/// Human-readable summary of an extracted record.
pub fn summary_text(record: &InvoiceRecord) -> String {
    let currency = &record.currency;
    let mut lines = vec![
        RULE.to_string(),
        "INVOICE PROCESSING COMPLETE".to_string(),
        RULE.to_string(),
        String::new(),
        "VENDOR INFORMATION:".to_string(),
        format!("  Name: {}", text_or_na(&record.vendor_name)),
        format!("  Address: {}", text_or_na(&record.vendor_address)),
        format!("  Email: {}", text_or_na(&record.vendor_email)),
        format!("  Phone: {}", text_or_na(&record.vendor_phone)),
        String::new(),
        "INVOICE DETAILS:".to_string(),
        format!("  Invoice Number: {}", text_or_na(&record.invoice_number)),
        format!("  Invoice Date: {}", text_or_na(&record.invoice_date)),
        format!("  Due Date: {}", text_or_na(&record.due_date)),
        String::new(),
        "CUSTOMER INFORMATION:".to_string(),
        format!("  Name: {}", text_or_na(&record.customer_name)),
        format!("  Address: {}", text_or_na(&record.customer_address)),
        String::new(),
        "FINANCIAL SUMMARY:".to_string(),
        format!("  Subtotal: {} {}", currency, amount_or(record.subtotal, "0.00")),
        format!(
            "  Tax ({}%): {} {}",
            amount_or(record.tax_rate, "0"),
            currency,
            amount_or(record.tax_amount, "0.00")
        ),
        format!("  Total: {} {}", currency, amount_or(record.total_amount, "0.00")),
        String::new(),
        "LINE ITEMS:".to_string(),
    ];

    if record.line_items.is_empty() {
        lines.push("  No line items found".to_string());
    } else {
        lines.push(format!("  Total Items: {}", record.line_items.len()));
        for (i, item) in record.line_items.iter().enumerate() {
            if !item.is_mapping() {
                continue;
            }
            let show = |key: &str| {
                item.get(key)
                    .filter(|v| !v.is_null())
                    .map(cell)
                    .unwrap_or_else(|| "N/A".to_string())
            };
            lines.push(format!(
                "  {}. {} - Qty: {}, Price: {}, Total: {}",
                i + 1,
                show("description"),
                show("quantity"),
                show("unit_price"),
                show("total")
            ));
        }
    }

    lines.extend([
        String::new(),
        "PAYMENT TERMS:".to_string(),
        format!("  {}", text_or_na(&record.payment_terms)),
        String::new(),
        RULE.to_string(),
    ]);

    lines.join("\n")
}

/// Write every output selected by `format` into `dir`.
///
/// Returns the names of the files written, `summary.txt` last.
pub fn save_outputs(record: &InvoiceRecord, format: OutputFormat, dir: &Path) -> anyhow::Result<Vec<String>> {
    fs::create_dir_all(dir)?;
    let mut files = Vec::new();

    if format.includes_csv() {
        info!("Generating CSV output...");
        let wrote_items = write_csv(record, &dir.join(INVOICE_CSV))?;
        files.push(INVOICE_CSV.to_string());
        if wrote_items {
            files.push(LINE_ITEMS_CSV.to_string());
        }
    }

    if format.includes_json() {
        info!("Generating JSON output...");
        write_json(record, &dir.join(INVOICE_JSON))?;
        files.push(INVOICE_JSON.to_string());
    }

    info!("Creating summary...");
    let mut summary = summary_text(record);
    summary.push_str("\n\nOUTPUT FILES:\n");
    for file in &files {
        summary.push_str(&format!("  - {}\n", file));
    }
    fs::write(dir.join(SUMMARY_TXT), summary)?;
    files.push(SUMMARY_TXT.to_string());

    info!("Created {} output files", files.len());
    Ok(files)
}

/// Short category of a pipeline failure, used in logs and the error report.
pub fn classify(error: &anyhow::Error) -> &'static str {
    for cause in error.chain() {
        let cause = match cause.downcast_ref::<InvexError>() {
            Some(InvexError::Pdf(e)) => return classify_pdf(e),
            Some(InvexError::Extraction(e)) => return classify_extraction(e),
            Some(InvexError::Config(_)) => return "Validation error",
            Some(InvexError::Io(_)) => return "I/O error",
            None => cause,
        };
        if let Some(e) = cause.downcast_ref::<PdfError>() {
            return classify_pdf(e);
        }
        if let Some(e) = cause.downcast_ref::<ExtractionError>() {
            return classify_extraction(e);
        }
        if cause.is::<ConfigError>() {
            return "Validation error";
        }
    }
    "Unexpected error"
}

fn classify_pdf(error: &PdfError) -> &'static str {
    match error {
        PdfError::NotFound(_) => "File not found",
        _ => "Validation error",
    }
}

fn classify_extraction(error: &ExtractionError) -> &'static str {
    match error {
        ExtractionError::DependencyUnavailable { .. } => "Missing dependency",
        _ => "Validation error",
    }
}

/// Write `error_log.txt` describing `error` and common fixes.
pub fn write_error_report(error: &anyhow::Error, dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(ERROR_LOG);

    let report = [
        RULE,
        "ERROR PROCESSING INVOICE",
        RULE,
        "",
        format!("Error: {:#}", error).as_str(),
        format!("Category: {}", classify(error)).as_str(),
        "",
        "TROUBLESHOOTING:",
        "",
        "Common Issues:",
        "  1. PDF file not found or invalid path",
        "  2. PDF is password-protected or corrupted",
        "  3. PDF contains no readable text (it may be a scanned image)",
        "  4. API key not set or invalid",
        "  5. Network issues connecting to the model provider",
        "",
        "Solutions:",
        "  - Ensure the PDF file exists and is not password-protected",
        "  - Set the correct environment variable for your provider:",
        "    * OPENAI_API_KEY for OpenAI",
        "    * ANTHROPIC_API_KEY for Anthropic Claude",
        "  - Run with --test-mode to check the pipeline without an API key",
        "  - Check your internet connection",
        "",
        RULE,
    ]
    .join("\n");

    fs::write(&path, report)?;
    Ok(path)
}
