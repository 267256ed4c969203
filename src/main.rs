use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    posrec::init_tracing(cli.log_level());
    cli::run(cli)
}
