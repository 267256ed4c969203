//! Layout helpers (`posrec layout ...`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use posrec::{LayoutSchema, field_positions, load_fields, record_width, write_sample_layout};

use crate::cli::common::{SchemaArg, schema_or};
use crate::cli::utils::load_table;

/// Layout subcommands.
#[derive(Subcommand, Debug)]
pub enum LayoutCommand {
    /// Write an empty layout.csv containing only the header row.
    Sample(LayoutSampleArgs),
    /// Validate a layout file and report every problem.
    Check(LayoutFileArgs),
    /// Show the column positions each field occupies.
    Show(LayoutFileArgs),
}

/// Arguments for `posrec layout sample`.
#[derive(Args, Debug)]
pub struct LayoutSampleArgs {
    /// Directory to write layout.csv into.
    #[arg(default_value = ".")]
    pub dir: PathBuf,
    /// Column set to emit.
    #[arg(long, value_enum)]
    pub schema: Option<SchemaArg>,
    /// Column delimiter.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

/// Arguments for commands that read one layout file.
#[derive(Args, Debug)]
pub struct LayoutFileArgs {
    /// Layout file to read.
    pub layout: PathBuf,
    /// Layout column set.
    #[arg(long, value_enum)]
    pub schema: Option<SchemaArg>,
}

/// Execute a layout command.
pub fn handle(command: LayoutCommand) -> Result<()> {
    match command {
        LayoutCommand::Sample(args) => sample(args),
        LayoutCommand::Check(args) => check(args),
        LayoutCommand::Show(args) => show(args),
    }
}

fn sample(args: LayoutSampleArgs) -> Result<()> {
    let schema = schema_or(args.schema, LayoutSchema::Current);
    let path = write_sample_layout(&args.dir, schema, args.delimiter)?;
    println!("Sample layout saved to {}", path.display());
    Ok(())
}

fn check(args: LayoutFileArgs) -> Result<()> {
    let table = load_table(&args.layout)?;
    let fields = load_fields(&table, schema_or(args.schema, LayoutSchema::Current))?;
    println!(
        "{}: {} fields, {} characters per record",
        args.layout.display(),
        fields.len(),
        record_width(&fields)
    );
    Ok(())
}

fn show(args: LayoutFileArgs) -> Result<()> {
    let table = load_table(&args.layout)?;
    let fields = load_fields(&table, schema_or(args.schema, LayoutSchema::Current))?;
    println!("Layout: {}", args.layout.display());
    for (field, pos) in fields.iter().zip(field_positions(&fields)) {
        println!(
            "  {}:{:>4}-{:<4} {:<24} {:>4} {:<5} '{}'{} {}",
            pos.line,
            pos.start,
            pos.end,
            field.name(),
            field.length(),
            field.alignment(),
            field.fill(),
            if field.required() { " required" } else { "" },
            field.rules()
        );
    }
    Ok(())
}
