//! Run context
//!
//! Everything one invocation needs to know, validated up front and then
//! passed by reference to each component. All configuration errors surface
//! here, before any file is processed.

use crate::error::{Result, ScoutError};
use crate::transfer::count_files;
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const RUN_DIR_PREFIX: &str = "jw_";
const RUN_DIR_FORMAT: &str = "%Y-%m-%d_%Hh-%Mm-%Ss";

/// Options as given on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// Parent of the per-run working directory
    pub working_root: PathBuf,
    pub dry_run: bool,
    pub debug: bool,
}

/// Validated, read-only configuration for one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// Timestamped directory holding this run's logs and listings
    pub working_dir: PathBuf,
    pub dry_run: bool,
    pub debug: bool,
    pub started_at: DateTime<Local>,
}

impl RunContext {
    /// Validate the options and create the run's working directory (and, on
    /// a live run, the output root).
    pub fn prepare(options: RunOptions) -> Result<Self> {
        validate_input_dir(&options.input_root)?;
        let input_root = resolve(&options.input_root)?;
        let output_root = resolve(&options.output_root)?;
        let working_root = resolve(&options.working_root)?;

        if output_root == input_root {
            return Err(config_error("output directory is the input directory", &output_root));
        }
        if output_root.starts_with(&input_root) {
            return Err(config_error("output directory is inside the input directory", &output_root));
        }
        if input_root.starts_with(&output_root) {
            return Err(config_error("input directory is inside the output directory", &input_root));
        }
        if working_root.starts_with(&output_root) {
            return Err(config_error("working directory is inside the output directory", &working_root));
        }
        if working_root.starts_with(&input_root) {
            return Err(config_error("working directory is inside the input directory", &working_root));
        }

        if output_root.exists() && !output_root.is_dir() {
            return Err(config_error("output path is not a directory", &output_root));
        }
        if !options.dry_run {
            fs::create_dir_all(&output_root)
                .map_err(|e| config_error(&format!("cannot create output directory ({})", e), &output_root))?;
            tempfile::tempfile_in(&output_root)
                .map_err(|e| config_error(&format!("output directory is not writable ({})", e), &output_root))?;
        }

        let started_at = Local::now();
        let working_dir = create_run_dir(&working_root, &started_at)?;
        debug!(working_dir = %working_dir.display(), "Created run directory");

        Ok(Self {
            input_root,
            output_root,
            working_dir,
            dry_run: options.dry_run,
            debug: options.debug,
            started_at,
        })
    }

    /// Fail unless the output root is missing or holds no files. Empty
    /// subdirectories do not count.
    pub fn require_empty_output(&self) -> Result<()> {
        match fs::read_dir(&self.output_root) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(config_error(&format!("cannot read output directory ({})", e), &self.output_root))
            }
        }
        if count_files(&self.output_root) > 0 {
            return Err(config_error("output directory is not empty", &self.output_root));
        }
        Ok(())
    }
}

fn config_error(message: &str, path: &Path) -> ScoutError {
    ScoutError::Config(format!("{}: {}", message, path.display()))
}

/// Input must exist, be a directory, and be listable.
pub fn validate_input_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(config_error("input directory not found", path));
    }
    if !path.is_dir() {
        return Err(config_error("input path is not a directory", path));
    }
    if fs::read_dir(path).is_err() {
        return Err(config_error("cannot read input directory", path));
    }
    Ok(())
}

/// Absolute, symlink-free form of a path that may not exist yet: the
/// longest existing ancestor is canonicalized and the rest appended.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return Ok(normalize(&resolved));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => return Ok(normalize(&absolute)),
        }
    }
}

/// Collapse `.` and `..` lexically
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Create `<root>/jw_<timestamp>`, adding `_2`, `_3`, … if taken.
fn create_run_dir(root: &Path, at: &DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(root).map_err(|e| config_error(&format!("cannot create working directory ({})", e), root))?;
    let base = format!("{}{}", RUN_DIR_PREFIX, at.format(RUN_DIR_FORMAT));
    let mut attempt = 1;
    loop {
        let name = if attempt == 1 {
            base.clone()
        } else {
            format!("{}_{}", base, attempt)
        };
        let dir = root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(config_error(&format!("cannot create run directory ({})", e), &dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(temp: &TempDir, dry_run: bool) -> RunOptions {
        let input = temp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        RunOptions {
            input_root: input,
            output_root: temp.path().join("out"),
            working_root: temp.path().join("work"),
            dry_run,
            debug: false,
        }
    }

    #[test]
    fn live_run_creates_output_and_run_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = RunContext::prepare(options(&temp, false)).unwrap();
        assert!(ctx.output_root.is_dir());
        assert!(ctx.working_dir.is_dir());
        let name = ctx.working_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("jw_"), "{}", name);
        assert!(ctx.working_dir.starts_with(temp.path().canonicalize().unwrap().join("work")));
    }

    #[test]
    fn dry_run_does_not_create_output() {
        let temp = TempDir::new().unwrap();
        let ctx = RunContext::prepare(options(&temp, true)).unwrap();
        assert!(ctx.dry_run);
        assert!(!temp.path().join("out").exists());
        assert!(ctx.working_dir.is_dir());
    }

    #[test]
    fn second_run_in_same_second_gets_suffix() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("work");
        let at = Local::now();
        let first = create_run_dir(&root, &at).unwrap();
        let second = create_run_dir(&root, &at).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("_2"));
    }

    #[test]
    fn missing_input_is_config_error() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp, false);
        opts.input_root = temp.path().join("nope");
        let err = RunContext::prepare(opts).unwrap_err();
        assert!(matches!(err, ScoutError::Config(ref m) if m.contains("not found")));
    }

    #[test]
    fn input_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp, false);
        let file = temp.path().join("file.xml");
        fs::write(&file, "x").unwrap();
        opts.input_root = file;
        assert!(matches!(RunContext::prepare(opts), Err(ScoutError::Config(_))));
    }

    #[test]
    fn nested_roots_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp, false);
        opts.output_root = opts.input_root.join("restructured");
        assert!(matches!(RunContext::prepare(opts), Err(ScoutError::Config(_))));

        let mut opts = options(&temp, false);
        opts.working_root = temp.path().join("out").join("logs");
        assert!(matches!(RunContext::prepare(opts), Err(ScoutError::Config(_))));

        let mut opts = options(&temp, false);
        opts.working_root = opts.input_root.join("..").join("in").join("logs");
        assert!(matches!(RunContext::prepare(opts), Err(ScoutError::Config(_))));
    }

    #[test]
    fn require_empty_output() {
        let temp = TempDir::new().unwrap();
        let ctx = RunContext::prepare(options(&temp, false)).unwrap();
        ctx.require_empty_output().unwrap();

        // Directories left by an earlier, empty run are fine
        fs::create_dir_all(ctx.output_root.join("BNWL/1874/01")).unwrap();
        ctx.require_empty_output().unwrap();

        fs::write(ctx.output_root.join("BNWL/1874/01/stray.txt"), "x").unwrap();
        assert!(matches!(ctx.require_empty_output(), Err(ScoutError::Config(_))));
    }
}
