//! `rewrite-ids`: swap title codes for catalog codes in alto2txt output

use crate::cli::error::HelpfulError;
use crate::cli::{output, prepare_run, progress, start_logging, RunArgs};
use anyhow::Result;
use clap::Args as ClapArgs;
use jisc_scout::lookup::DEFAULT_LOOKUP_FILE;
use jisc_scout::{IdentifierRewriter, TitleCodeTable};
use std::path::PathBuf;
use tracing::info;

pub const LOG_FILE: &str = "jw_alto2txt.log";

#[derive(ClapArgs, Debug)]
pub struct RewriteIdsArgs {
    /// Directory of `*_metadata.xml` / `*.txt` pairs (never modified)
    pub input_dir: PathBuf,

    /// Empty directory that receives the rewritten pairs
    pub output_dir: PathBuf,

    /// Pipe-delimited title code lookup [default: data/title_code_lookup.csv]
    #[arg(short, long)]
    pub lookup: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run(args: RewriteIdsArgs) -> Result<()> {
    let config = args.run.load_config()?;
    let lookup_path = args
        .lookup
        .clone()
        .or_else(|| config.lookup_file.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOOKUP_FILE));
    let table = TitleCodeTable::load_csv(&lookup_path).map_err(|e| HelpfulError::lookup_file(&lookup_path, &e))?;

    let ctx = prepare_run(&args.input_dir, &args.output_dir, &args.run, &config)?;
    ctx.require_empty_output()
        .map_err(|_| HelpfulError::output_not_empty(&ctx.output_root))?;
    start_logging(&ctx, LOG_FILE)?;
    info!(lookup = %lookup_path.display(), titles = table.len(), "Loaded title code lookup");

    let visible = !ctx.debug;
    let report = progress::run_with_progress(
        |tx| IdentifierRewriter::new(&ctx, &table).with_progress(tx).run(),
        |rx| progress::show_rewrite(rx, visible),
    )??;

    print!(
        "{}",
        output::rewrite_summary(&report.summary, &report.audit, &ctx.working_dir)
    );
    Ok(())
}
