//! Command-line interface wiring for the `posrec` binary.
//!
//! This module owns the clap definitions and delegates execution to
//! specialized submodules that encapsulate each command family.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

pub mod common;
pub mod convert;
pub mod layout;
pub mod rules;
pub mod utils;

/// Parsed CLI entrypoint for the `posrec` binary.
#[derive(Parser, Debug)]
#[command(
    name = "posrec",
    version,
    about = "Convert tabular data into fixed-width positional text using a layout file"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Top-level command to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Default log filter derived from `-v` flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// High-level command families made available to end users.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert an input table into positional records.
    Convert(convert::ConvertArgs),
    /// Create, check and inspect layout files.
    #[command(subcommand)]
    Layout(layout::LayoutCommand),
    /// List the format rules a layout may use.
    Rules,
}

/// Execute the requested command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(args) => convert::handle(args),
        Command::Layout(cmd) => layout::handle(cmd),
        Command::Rules => rules::handle(),
    }
}
