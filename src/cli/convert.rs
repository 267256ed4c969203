//! Conversion command (`posrec convert ...`).

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use posrec::{
    ConversionReport, ConvertOptions, FileReport, OutputEncoding, convert, is_stdout,
    plan_output, record_width, write_files,
};

use crate::cli::common::{SchemaArg, schema_or};
use crate::cli::utils::{load_options, load_table, write_json};

/// Arguments for `posrec convert`.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Layout file (CSV, delimiter detected from the header).
    #[arg(short = 'l', long)]
    pub layout: PathBuf,
    /// Input table: CSV (delimiter detected from the header) or a spreadsheet workbook,
    /// read from its first sheet.
    #[arg(short = 'i', long)]
    pub input: PathBuf,
    /// Output text file (`-` for stdout).
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// JSON file with conversion options.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Layout column set.
    #[arg(long, value_enum)]
    pub schema: Option<SchemaArg>,
    /// Output encoding label (single-byte encodings only).
    #[arg(long)]
    pub encoding: Option<String>,
    /// Split output into numbered files of at most N records.
    #[arg(long = "split-every", value_name = "N")]
    pub split_every: Option<usize>,
    /// Encode rows on a single thread.
    #[arg(long)]
    pub sequential: bool,
    /// Write a JSON report with counts and SHA-256 digests.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Run every check without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl ConvertArgs {
    /// Explicit flags win over config file values.
    fn apply(&self, options: &mut ConvertOptions) {
        options.schema = schema_or(self.schema, options.schema);
        if let Some(encoding) = &self.encoding {
            options.encoding = encoding.clone();
        }
        if self.split_every.is_some() {
            options.records_per_file = self.split_every;
        }
        if self.sequential {
            options.parallel = false;
        }
    }
}

/// Execute a conversion.
pub fn handle(args: ConvertArgs) -> Result<()> {
    let mut options = load_options(args.config.as_deref())?;
    args.apply(&mut options);
    let encoding = OutputEncoding::for_label(&options.encoding)?;

    let layout = load_table(&args.layout)?;
    let input = load_table(&args.input)?;
    let conversion = convert(&layout, &input, &options)?;
    let files = plan_output(
        &conversion.records,
        encoding,
        &args.output,
        options.records_per_file,
    )?;

    if !args.dry_run {
        write_files(&files)?;
    }

    if let Some(path) = &args.report {
        let report = ConversionReport {
            generated_at: Utc::now(),
            layout: args.layout.display().to_string(),
            input: args.input.display().to_string(),
            encoding: encoding.name().to_string(),
            fields: conversion.fields.len(),
            record_width: record_width(&conversion.fields),
            records: conversion.records.len(),
            files: files.iter().map(FileReport::from_output).collect(),
        };
        write_json(path, &report)?;
    }

    let verb = if args.dry_run { "Checked" } else { "Wrote" };
    let summary = format!(
        "{verb} {} records ({} fields) into {} file(s) as {}",
        conversion.records.len(),
        conversion.fields.len(),
        files.len(),
        encoding.name()
    );
    if is_stdout(&args.output) {
        eprintln!("{summary}");
    } else {
        println!("{summary}");
    }
    Ok(())
}
