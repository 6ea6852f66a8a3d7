//! File transfer
//!
//! The only code that writes under an output root. Content is streamed into a
//! temporary file in the destination directory and then linked into place
//! without replacing anything, so a destination either holds the complete
//! file or does not exist.

use crate::canonical::CanonicalPath;
use crate::types::{CandidateFile, TransferOutcome};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

const TEMP_PREFIX: &str = ".jw-";

/// Running totals for one executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files_written: u64,
    pub bytes_written: u64,
    pub simulated: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
pub struct TransferExecutor {
    stats: TransferStats,
}

impl TransferExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Copy a matched file to its canonical path. Never moves, never
    /// overwrites. Errors become `Failed`; the caller carries on.
    pub fn transfer(&mut self, candidate: &CandidateFile, canonical: &CanonicalPath, dry_run: bool) -> TransferOutcome {
        if dry_run {
            self.stats.simulated += 1;
            debug!(source = %candidate.path.display(), dest = %canonical.path.display(), "Dry run: would copy");
            return TransferOutcome::SkippedDryRun;
        }
        match self.copy_file(&candidate.path, &canonical.path) {
            Ok(bytes) => {
                debug!(source = %candidate.path.display(), dest = %canonical.path.display(), bytes, "Copied");
                TransferOutcome::Copied
            }
            Err(e) => {
                warn!(source = %candidate.path.display(), dest = %canonical.path.display(), error = %e, "Copy failed");
                TransferOutcome::Failed { cause: e.to_string() }
            }
        }
    }

    /// Byte-for-byte copy of `src` to a new file at `dest`; returns the
    /// number of bytes written. Source permissions are carried over.
    pub fn copy_file(&mut self, src: &Path, dest: &Path) -> io::Result<u64> {
        let result = fs::File::open(src).and_then(|mut input| {
            let permissions = input.metadata()?.permissions();
            self.write_new(dest, |out| {
                let n = io::copy(&mut input, out)?;
                fs::set_permissions(out.path(), permissions)?;
                Ok(n)
            })
        });
        self.tally(&result);
        result
    }

    /// Write `bytes` to a new file at `dest`.
    pub fn write_bytes(&mut self, dest: &Path, bytes: &[u8]) -> io::Result<u64> {
        let result = self.write_new(dest, |out| {
            out.write_all(bytes)?;
            Ok(bytes.len() as u64)
        });
        self.tally(&result);
        result
    }

    /// Remove a file this executor wrote when the rest of its unit of work
    /// could not be written.
    pub fn discard(&mut self, dest: &Path, bytes: u64) -> io::Result<()> {
        fs::remove_file(dest)?;
        self.stats.files_written = self.stats.files_written.saturating_sub(1);
        self.stats.bytes_written = self.stats.bytes_written.saturating_sub(bytes);
        debug!(dest = %dest.display(), "Discarded partial output");
        Ok(())
    }

    fn tally(&mut self, result: &io::Result<u64>) {
        match result {
            Ok(n) => {
                self.stats.files_written += 1;
                self.stats.bytes_written += n;
            }
            Err(_) => self.stats.failed += 1,
        }
    }

    fn write_new<F>(&self, dest: &Path, fill: F) -> io::Result<u64>
    where
        F: FnOnce(&mut tempfile::NamedTempFile) -> io::Result<u64>,
    {
        let dir = dest
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
        fs::create_dir_all(dir)?;
        if dest.symlink_metadata().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            ));
        }

        let mut tmp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
        let n = fill(&mut tmp)?;
        tmp.as_file_mut().flush()?;
        // Dropping the temp file on any error above removes it
        tmp.persist_noclobber(dest).map_err(|e| e.error)?;
        Ok(n)
    }
}

/// Number of regular files under `root` (0 if it does not exist).
pub fn count_files(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
