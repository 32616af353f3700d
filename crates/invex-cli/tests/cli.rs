use std::fs;
use std::path::Path;

use assert_cmd::Command;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;

const ENV_VARS: [&str; 6] = [
    "invoice_file",
    "output_format",
    "ai_provider",
    "test_mode",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
];

/// `invex` running in `dir` with none of the pipeline variables inherited
/// and its per-user config directory under `dir/config`.
fn invex(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invex").unwrap();
    cmd.current_dir(dir).env("XDG_CONFIG_HOME", dir.join("config"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn invoice_lines(number: &str) -> Vec<String> {
    vec![
        "Northwind Traders".to_string(),
        format!("Invoice {}", number),
        "Total: $99.00".to_string(),
    ]
}

fn write_invoice_pdf<S: AsRef<str>>(path: &Path, lines: &[S]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![16.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_ref())]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

const INVOICE_LINES: [&str; 5] = [
    "Northwind Traders",
    "billing@northwind.example",
    "Invoice INV-2024-042",
    "Consulting 10 h",
    "Total: $1,250.00",
];

#[test]
fn test_missing_input_writes_error_log() {
    let dir = tempfile::tempdir().unwrap();

    invex(dir.path())
        .args(["process", "missing.pdf", "--output-dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PDF file not found"));

    let report = fs::read_to_string(dir.path().join("out").join("error_log.txt")).unwrap();
    assert!(report.contains("ERROR PROCESSING INVOICE"));
    assert!(report.contains("Category: File not found"));
}

#[test]
fn test_unsupported_provider_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    invex(dir.path())
        .args(["process", "invoice.pdf", "-o", "out"])
        .env("ai_provider", "gemini")
        .assert()
        .failure();

    let report = fs::read_to_string(dir.path().join("out").join("error_log.txt")).unwrap();
    assert!(report.contains("unsupported provider: gemini"));
}

#[test]
fn test_unsupported_format_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    invex(dir.path())
        .args(["process", "invoice.pdf", "-o", "out", "--format", "xml"])
        .assert()
        .failure();

    let report = fs::read_to_string(dir.path().join("out").join("error_log.txt")).unwrap();
    assert!(report.contains("unsupported output format: xml"));
}

#[test]
fn test_process_in_test_mode() {
    let dir = tempfile::tempdir().unwrap();
    write_invoice_pdf(&dir.path().join("invoice.pdf"), &INVOICE_LINES);

    invex(dir.path())
        .args(["process", "--test-mode", "--format", "both", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fallback extractor"));

    let out = dir.path().join("out");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("invoice_data.json")).unwrap()).unwrap();
    assert_eq!(json["invoice_number"], "INV-2024-042");
    assert_eq!(json["total_amount"], 1250.0);
    assert_eq!(json["vendor_email"], "billing@northwind.example");
    assert_eq!(json["currency"], "USD");

    let csv = fs::read_to_string(out.join("invoice_data.csv")).unwrap();
    assert!(csv.starts_with("Field,Value"));
    assert!(csv.contains("Total Amount,1250.0"));

    let summary = fs::read_to_string(out.join("summary.txt")).unwrap();
    assert!(summary.contains("Invoice Number: INV-2024-042"));
    assert!(summary.contains("  - invoice_data.json"));
    assert!(!out.join("line_items.csv").exists());
    assert!(!out.join("error_log.txt").exists());
}

#[test]
fn test_process_without_api_key_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    write_invoice_pdf(&dir.path().join("march.pdf"), &INVOICE_LINES);

    invex(dir.path())
        .args(["process", "march.pdf", "-o", "out", "--provider", "anthropic"])
        .assert()
        .success();

    assert!(dir.path().join("out").join("invoice_data.csv").exists());
    assert!(!dir.path().join("out").join("invoice_data.json").exists());
}

#[test]
fn test_batch_with_summary() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = dir.path().join("inbox");
    fs::create_dir(&inbox).unwrap();
    write_invoice_pdf(&inbox.join("a.pdf"), &INVOICE_LINES);
    fs::write(inbox.join("b.pdf"), b"not a pdf").unwrap();

    invex(dir.path())
        .args(["batch", "inbox/*.pdf", "-o", "out", "--test-mode", "--summary", "--continue-on-error"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful"));

    let out = dir.path().join("out");
    assert!(out.join("a").join("invoice_data.csv").exists());
    assert!(out.join("b").join("error_log.txt").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("a.pdf,a,success,INV-2024-042"));
    assert!(summary.contains("b.pdf,b,error"));
}

#[test]
fn test_batch_keeps_files_sharing_a_name() {
    let dir = tempfile::tempdir().unwrap();
    for month in ["feb", "jan"] {
        let month_dir = dir.path().join("in").join(month);
        fs::create_dir_all(&month_dir).unwrap();
        let number = format!("INV-{}-1", month.to_uppercase());
        write_invoice_pdf(&month_dir.join("invoice.pdf"), &invoice_lines(&number));
    }

    invex(dir.path())
        .args(["batch", "in/*/invoice.pdf", "-o", "out", "--test-mode", "-f", "json", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful"));

    let out = dir.path().join("out");
    for (subdir, number) in [("feb-invoice", "INV-FEB-1"), ("jan-invoice", "INV-JAN-1")] {
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(subdir).join("invoice_data.json")).unwrap())
                .unwrap();
        assert_eq!(json["invoice_number"], number);
    }
    assert!(!out.join("invoice").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("invoice.pdf,feb-invoice,success,INV-FEB-1"));
    assert!(summary.contains("invoice.pdf,jan-invoice,success,INV-JAN-1"));
}

#[test]
fn test_batch_without_matches_fails() {
    let dir = tempfile::tempdir().unwrap();

    invex(dir.path())
        .args(["batch", "nothing/*.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files found"));
}

#[test]
fn test_config_path_and_init() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("invex.json");
    let config_arg = config.to_str().unwrap();

    invex(dir.path())
        .args(["--config", config_arg, "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));

    invex(dir.path())
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .success();

    invex(dir.path())
        .args(["--config", config_arg, "config", "get", "output.format"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"csv\""));
}

#[cfg(target_os = "linux")]
#[test]
fn test_process_reads_user_config() {
    let dir = tempfile::tempdir().unwrap();
    write_invoice_pdf(&dir.path().join("invoice.pdf"), &INVOICE_LINES);

    invex(dir.path())
        .args(["config", "set", "output.format", "json"])
        .assert()
        .success();
    assert!(dir.path().join("config").join("invex").join("config.json").is_file());

    invex(dir.path())
        .args(["process", "--test-mode", "-o", "out"])
        .assert()
        .success();

    let out = dir.path().join("out");
    assert!(out.join("invoice_data.json").exists());
    assert!(!out.join("invoice_data.csv").exists());
}
