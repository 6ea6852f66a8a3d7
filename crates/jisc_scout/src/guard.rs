//! Duplicate detection
//!
//! A canonical path is taken if a file already sits there from an earlier
//! run, or if an earlier candidate in this run claimed it. Taken paths are
//! never written; the guard only reports who owns them and whether the
//! contents match.

use crate::canonical::CanonicalPath;
use crate::types::{DuplicateKind, DuplicateOrigin};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Fresh,
    Duplicate {
        /// File already owning the canonical path (for this-run claims, the
        /// input file that claimed it)
        existing: PathBuf,
        origin: DuplicateOrigin,
        kind: DuplicateKind,
    },
}

/// Tracks canonical paths claimed during one run.
///
/// Owned by the single processing loop; concurrent traversal would need an
/// insert-if-absent structure here instead.
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    claimed: HashMap<PathBuf, PathBuf>,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `source` may be transferred to `canonical`.
    pub fn check(&self, canonical: &CanonicalPath, source: &Path) -> GuardVerdict {
        if let Some(owner) = self.claimed.get(&canonical.path) {
            return GuardVerdict::Duplicate {
                existing: owner.clone(),
                origin: DuplicateOrigin::ThisRun,
                kind: compare(source, owner),
            };
        }

        // symlink_metadata so that a dangling link still counts as taken
        if canonical.path.symlink_metadata().is_ok() {
            return GuardVerdict::Duplicate {
                existing: canonical.path.clone(),
                origin: DuplicateOrigin::PriorRun,
                kind: compare(source, &canonical.path),
            };
        }

        GuardVerdict::Fresh
    }

    /// Record that `source` now owns `canonical`. Called after a successful
    /// (or simulated) transfer only.
    pub fn claim(&mut self, canonical: &CanonicalPath, source: &Path) {
        self.claimed
            .entry(canonical.path.clone())
            .or_insert_with(|| source.to_path_buf());
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains_key(path)
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}

fn compare(a: &Path, b: &Path) -> DuplicateKind {
    match (hash_file(a), hash_file(b)) {
        (Ok(x), Ok(y)) if x == y => DuplicateKind::Identical,
        (Ok(_), Ok(_)) => DuplicateKind::Conflicting,
        (Err(e), _) | (_, Err(e)) => {
            debug!(left = %a.display(), right = %b.display(), error = %e, "Could not hash duplicate pair");
            DuplicateKind::Unverified
        }
    }
}

/// BLAKE3 digest of a file's content
pub fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}
