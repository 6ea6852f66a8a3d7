//! CLI command implementations
//!
//! Both commands share the same shape: validate paths, prepare the run
//! directory, start logging into it, then drive the engine on a worker
//! thread while the main thread draws progress.

pub mod error;
pub mod output;
pub mod progress;
pub mod restructure;
pub mod rewrite_ids;

use crate::cli::error::HelpfulError;
use anyhow::{Context, Result};
use jisc_logging::{init_logging, LogConfig};
use jisc_scout::{RunContext, RunOptions, WranglerConfig};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "jisc-wrangler";
const DEFAULT_WORKING_DIR: &str = ".";

/// Options shared by every command
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Where the run directory (logs and audit listings) is created [default: .]
    #[arg(short, long)]
    pub working_dir: Option<PathBuf>,

    /// Classify and report without writing anything to the output
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose logging; disables the progress bar
    #[arg(short, long)]
    pub debug: bool,

    /// TOML settings file
    #[arg(short, long, env = "JISC_WRANGLER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn load_config(&self) -> Result<WranglerConfig, HelpfulError> {
        match self.config {
            Some(ref path) => WranglerConfig::load(path).map_err(|e| HelpfulError::config_file(path, &e)),
            None => Ok(WranglerConfig::default()),
        }
    }

    /// Command line beats the settings file, which beats the default.
    fn working_root(&self, config: &WranglerConfig) -> PathBuf {
        self.working_dir
            .clone()
            .or_else(|| config.working_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKING_DIR))
    }
}

fn check_input_dir(path: &Path) -> Result<(), HelpfulError> {
    if !path.exists() {
        return Err(HelpfulError::path_not_found(path));
    }
    if !path.is_dir() {
        return Err(HelpfulError::not_a_directory(path));
    }
    Ok(())
}

/// Validate the directories and create the run directory.
pub fn prepare_run(
    input_dir: &Path,
    output_dir: &Path,
    args: &RunArgs,
    config: &WranglerConfig,
) -> Result<RunContext, HelpfulError> {
    check_input_dir(input_dir)?;
    RunContext::prepare(RunOptions {
        input_root: input_dir.to_path_buf(),
        output_root: output_dir.to_path_buf(),
        working_root: args.working_root(config),
        dry_run: args.dry_run,
        debug: args.debug,
    })
    .map_err(|e| HelpfulError::invalid_run(&e))
}

/// Send this run's log into its run directory.
pub fn start_logging(ctx: &RunContext, log_name: &str) -> Result<()> {
    init_logging(LogConfig {
        app_name: APP_NAME,
        log_file: ctx.working_dir.join(log_name),
        debug: ctx.debug,
        quiet_console: !ctx.debug,
    })
    .context("Failed to start logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(working_dir: Option<&str>) -> RunArgs {
        RunArgs {
            working_dir: working_dir.map(PathBuf::from),
            dry_run: false,
            debug: false,
            config: None,
        }
    }

    #[test]
    fn working_dir_precedence() {
        let config = WranglerConfig {
            working_dir: Some("/from/config".into()),
            ..Default::default()
        };
        assert_eq!(args(Some("/from/cli")).working_root(&config), PathBuf::from("/from/cli"));
        assert_eq!(args(None).working_root(&config), PathBuf::from("/from/config"));
        assert_eq!(args(None).working_root(&WranglerConfig::default()), PathBuf::from("."));
    }

    #[test]
    fn missing_input_is_reported_before_anything_is_created() {
        let temp = tempfile::TempDir::new().unwrap();
        let input = temp.path().join("missing");
        let output = temp.path().join("out");
        let err = prepare_run(&input, &output, &args(None), &WranglerConfig::default()).unwrap_err();
        assert!(err.message.contains("Input directory not found"));
        assert!(!output.exists());
    }
}
