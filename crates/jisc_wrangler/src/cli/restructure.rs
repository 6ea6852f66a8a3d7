//! `restructure`: copy data files into `<OUTPUT>/<TITLE>/<YYYY>/<MM>/<DD>/`

use crate::cli::error::HelpfulError;
use crate::cli::{output, prepare_run, progress, start_logging, RunArgs};
use anyhow::Result;
use clap::Args as ClapArgs;
use jisc_scout::{PathClassifier, PatternCatalog, Restructurer};
use std::path::PathBuf;
use tracing::info;

pub const LOG_FILE: &str = "jw.log";

#[derive(ClapArgs, Debug)]
pub struct RestructureArgs {
    /// Root of the mangled input tree (never modified)
    pub input_dir: PathBuf,

    /// Root of the restructured output tree
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run(args: RestructureArgs) -> Result<()> {
    let config = args.run.load_config()?;
    let catalog = PatternCatalog::with_config(&config).map_err(|e| {
        let path = args.run.config.clone().unwrap_or_default();
        HelpfulError::config_file(&path, &e)
    })?;
    let ctx = prepare_run(&args.input_dir, &args.output_dir, &args.run, &config)?;
    start_logging(&ctx, LOG_FILE)?;
    info!(rules = catalog.len(), "Pattern catalog ready");

    let classifier = PathClassifier::new(catalog);
    let visible = !ctx.debug;
    let report = progress::run_with_progress(
        |tx| Restructurer::new(&ctx, classifier).with_progress(tx).run(),
        |rx| progress::show_restructure(rx, visible),
    )??;

    print!(
        "{}",
        output::restructure_summary(&report.summary, &report.audit, &ctx.working_dir)
    );
    Ok(())
}
