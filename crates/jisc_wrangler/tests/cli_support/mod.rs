#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn wrangler_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_jisc-wrangler"))
}

pub fn run_cli(args: &[&str]) -> Output {
    Command::new(wrangler_bin())
        .args(args)
        .env_remove("JISC_WRANGLER_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute jisc-wrangler")
}

pub fn assert_cli_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Input, output and working directories under one temp root
pub struct CliEnv {
    _temp: TempDir,
    pub root: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub working_dir: PathBuf,
}

impl CliEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().to_path_buf();
        let input_dir = root.join("input");
        let output_dir = root.join("output");
        let working_dir = root.join("working");
        fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        fs::create_dir_all(&working_dir).expect("Failed to create working dir");
        Self {
            _temp: temp,
            root,
            input_dir,
            output_dir,
            working_dir,
        }
    }

    pub fn write_input(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.input_dir.join(rel), content)
    }

    pub fn write_root(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.root.join(rel), content)
    }

    pub fn arg(path: &Path) -> String {
        path.display().to_string()
    }

    /// The single run directory created under the working directory
    pub fn run_dir(&self) -> PathBuf {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.working_dir)
            .expect("Failed to read working dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        assert_eq!(dirs.len(), 1, "expected one run dir, found {:?}", dirs);
        dirs.remove(0)
    }
}

fn write(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    fs::write(path, content).expect("Failed to write file");
    path.to_path_buf()
}
