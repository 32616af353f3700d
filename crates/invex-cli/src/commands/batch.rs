//! Batch processing command for multiple invoice files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use invex_core::{Credentials, ExtractionClient, ExtractionResult, OutputFormat, Provider};

use crate::output::{self, format_number};
use crate::pipeline;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching invoice PDFs (e.g. "invoices/*.pdf")
    #[arg(required = true)]
    input: String,

    /// Output directory; each invoice gets a subdirectory named after the file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file: csv, json or both
    #[arg(short, long)]
    format: Option<String>,

    /// Model provider: openai or anthropic
    #[arg(short, long, env = "ai_provider")]
    provider: Option<String>,

    /// Model name or alias
    #[arg(short, long)]
    model: Option<String>,

    /// Use the offline regex extractor instead of a model
    #[arg(long, env = "test_mode")]
    test_mode: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    /// Subdirectory of the output directory holding this file's outputs.
    output: String,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = pipeline::load_config(config_path)?;

    let format = match &args.format {
        Some(name) => name.parse::<OutputFormat>()?,
        None => config.output.format,
    };
    let provider = match &args.provider {
        Some(name) => name.parse::<Provider>()?,
        None => config.extraction.provider,
    };
    let model = args.model.as_deref().or(config.extraction.model.as_deref());
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&output_dir)?;

    let client = ExtractionClient::from_config(Credentials::from_env(), &config.extraction);
    let extractor = pipeline::select_extractor(&client, &config.extraction, provider, model, args.test_mode)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    let names = output_names(&files);

    for (path, subdir) in files.into_iter().zip(names) {
        let file_start = Instant::now();
        let file_dir = output_dir.join(&subdir);

        let outcome = pipeline::process_file(&path, &config, extractor.as_ref()).and_then(|result| {
            output::save_outputs(&result.record, format, &file_dir)?;
            Ok(result)
        });
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                debug!("Wrote outputs for {} to {}", path.display(), file_dir.display());
                results.push(ProcessResult {
                    path,
                    output: subdir,
                    result: Some(result),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                if let Err(report_err) = output::write_error_report(&e, &file_dir) {
                    warn!("Could not write error report for {}: {}", path.display(), report_err);
                }

                let error_msg = format!("{:#}", e);
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        output: subdir,
                        result: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    let successful = results.iter().filter(|r| r.result.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    // Generate summary if requested
    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice")
        .to_string()
}

/// Output subdirectory name for each file, unique within the batch.
///
/// The file stem is used as is unless another file shares it; then the
/// parent directory name is prefixed (`jan-invoice`), and a numeric suffix
/// settles whatever still collides.
fn output_names(files: &[PathBuf]) -> Vec<String> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for path in files {
        *stem_counts.entry(file_stem(path)).or_default() += 1;
    }

    let mut used = HashSet::new();
    files
        .iter()
        .map(|path| {
            let stem = file_stem(path);
            let shared = stem_counts.get(&stem).is_some_and(|&n| n > 1);
            let base = match path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
                Some(parent) if shared => format!("{}-{}", parent, stem),
                _ => stem,
            };

            let mut name = base.clone();
            let mut suffix = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            if shared {
                warn!("{} shares its file name with another input, writing to {}/", path.display(), name);
            }
            name
        })
        .collect()
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "file",
        "output",
        "status",
        "invoice_number",
        "vendor_name",
        "total_amount",
        "currency",
        "line_items",
        "error",
        "processing_time_ms",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(extraction) = &result.result {
            let record = &extraction.record;
            wtr.write_record([
                filename,
                result.output.as_str(),
                "success",
                record.invoice_number.as_deref().unwrap_or(""),
                record.vendor_name.as_deref().unwrap_or(""),
                &record.total_amount.map(format_number).unwrap_or_default(),
                &record.currency,
                &record.line_items.len().to_string(),
                "",
                &result.processing_time_ms.to_string(),
            ])?;
        } else {
            wtr.write_record([
                filename,
                result.output.as_str(),
                "error",
                "",
                "",
                "",
                "",
                "",
                result.error.as_deref().unwrap_or(""),
                &result.processing_time_ms.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
