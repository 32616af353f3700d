//! Process command - extract data from a single invoice file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use invex_core::{
    extract_invoice_text, read_metadata, run_extractor, Credentials, ExtractionClient, InvexConfig,
    OutputConfig, OutputFormat, Provider,
};

use crate::output;
use crate::pipeline;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Invoice PDF to process
    #[arg(env = "invoice_file", default_value = "invoice.pdf")]
    input: PathBuf,

    /// Output format: csv, json or both
    #[arg(short, long, env = "output_format")]
    format: Option<String>,

    /// Output directory (default from config, "output")
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Model provider: openai or anthropic
    #[arg(short, long, env = "ai_provider")]
    provider: Option<String>,

    /// Model name or alias (e.g. gpt-4-turbo, claude-3-opus)
    #[arg(short, long)]
    model: Option<String>,

    /// Use the offline regex extractor instead of a model
    #[arg(long, env = "test_mode")]
    test_mode: bool,

    /// Print data-quality issues found in the extracted record
    #[arg(long)]
    validate: bool,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = match pipeline::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            let dir = args
                .output_dir
                .clone()
                .unwrap_or_else(|| OutputConfig::default().directory);
            report_failure(&e, &dir);
            return Err(e);
        }
    };
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());

    let result = execute(&args, &config, &output_dir);
    if let Err(e) = &result {
        report_failure(e, &output_dir);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    result
}

fn report_failure(error: &anyhow::Error, dir: &Path) {
    error!("{}: {:#}", output::classify(error), error);
    match output::write_error_report(error, dir) {
        Ok(path) => eprintln!(
            "{} {:#}\n  Details written to {}",
            style("✗").red(),
            error,
            path.display()
        ),
        Err(e) => warn!("Could not write error report to {}: {}", dir.display(), e),
    }
}

fn execute(args: &ProcessArgs, config: &InvexConfig, output_dir: &Path) -> anyhow::Result<()> {
    let pb = ProgressBar::new(4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    info!("[Step 1/4] Reading configuration...");
    pb.set_message("Reading configuration...");

    let format = match &args.format {
        Some(name) => name.parse::<OutputFormat>()?,
        None => config.output.format,
    };
    let provider = match &args.provider {
        Some(name) => name.parse::<Provider>()?,
        None => config.extraction.provider,
    };
    let model = args.model.as_deref().or(config.extraction.model.as_deref());

    info!("Invoice file: {}", args.input.display());
    info!("Output format: {}", format);
    info!("Provider: {}", provider);

    match read_metadata(&args.input, &config.pdf) {
        Ok(meta) => info!("PDF info: {} pages, {} MB", meta.num_pages, meta.file_size_mb()),
        Err(e) => warn!("Could not read PDF metadata: {}", e),
    }
    pb.inc(1);

    info!("[Step 2/4] Extracting text from PDF...");
    pb.set_message("Extracting text...");
    let text = extract_invoice_text(&args.input, &config.pdf)?;
    info!("Extracted {} characters", text.len());
    pb.inc(1);

    info!("[Step 3/4] Parsing invoice with {}...", provider.as_str().to_uppercase());
    pb.set_message("Extracting invoice data...");
    let client = ExtractionClient::from_config(Credentials::from_env(), &config.extraction);
    let extractor = pipeline::select_extractor(&client, &config.extraction, provider, model, args.test_mode)?;
    let result = run_extractor(extractor.as_ref(), &text)?;
    info!("Invoice parsed successfully");
    info!("Found {} line items", result.record.line_items.len());
    pb.inc(1);

    info!("[Step 4/4] Saving outputs...");
    pb.set_message("Saving outputs...");
    let files = output::save_outputs(&result.record, format, output_dir)?;
    pb.inc(1);
    pb.finish_with_message("Done");

    if args.validate && !result.warnings.is_empty() {
        eprintln!("{}", style("Validation issues:").yellow());
        for issue in &result.warnings {
            eprintln!("  - {}", issue);
        }
    }

    println!(
        "{} Extracted invoice with {} extractor in {}ms",
        style("✓").green(),
        result.extractor,
        result.processing_time_ms
    );
    for file in &files {
        println!("  - {}", output_dir.join(file).display());
    }

    Ok(())
}
