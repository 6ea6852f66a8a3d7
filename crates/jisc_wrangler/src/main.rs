//! jisc-wrangler: restructure the JISC newspaper XML collection
//!
//! Usage:
//!   jisc-wrangler restructure <INPUT_DIR> <OUTPUT_DIR> [--dry-run]
//!   jisc-wrangler rewrite-ids <INPUT_DIR> <OUTPUT_DIR> [--lookup FILE]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "jisc-wrangler")]
#[command(version)]
#[command(about = "Restructure JISC newspaper XML into <TITLE>/<YYYY>/<MM>/<DD> directories")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy every recognised data file into the canonical directory layout
    Restructure(cli::restructure::RestructureArgs),

    /// Replace title codes with catalog codes in alto2txt metadata
    #[command(name = "rewrite-ids")]
    RewriteIds(cli::rewrite_ids::RewriteIdsArgs),
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Restructure(args) => cli::restructure::run(args),
        Commands::RewriteIds(args) => cli::rewrite_ids::run(args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
