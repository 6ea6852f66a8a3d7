//! Directory walking
//!
//! Enumerates every file under the input root, lazily, in a stable order
//! (files before subdirectories, then by name). Each file is tagged with the
//! title-code directory it sits under so progress can be reported per title.

use crate::types::{normalize_path_to_forward_slashes, CandidateFile};
use std::fmt;
use std::fs;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// An entry the walk found but could not read: an unlistable directory, an
/// unstattable file, or a symlink whose target is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableEntry {
    pub path: PathBuf,
    pub cause: String,
}

impl UnreadableEntry {
    fn from_walk_error(root: &Path, err: walkdir::Error) -> Self {
        Self {
            path: err.path().unwrap_or(root).to_path_buf(),
            cause: err.to_string(),
        }
    }
}

impl fmt::Display for UnreadableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.cause)
    }
}

pub type WalkItem = std::result::Result<CandidateFile, UnreadableEntry>;

/// Files sharing a title-code directory, in walk order
#[derive(Debug, Clone)]
pub struct TitleGroup {
    pub key: String,
    pub files: Vec<CandidateFile>,
}

/// Totals from a counting pass, used to size progress displays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSurvey {
    pub files: usize,
    pub groups: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh walk of the tree. Unreadable entries are yielded as errors and
    /// the walk continues past them.
    pub fn walk(&self) -> impl Iterator<Item = WalkItem> {
        let root = self.root.clone();
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by(|a, b| {
                (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
            })
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => classify_entry(&root, entry),
                Err(e) => Some(Err(UnreadableEntry::from_walk_error(&root, e))),
            })
    }

    /// The walk, batched into consecutive runs of files with the same group key
    pub fn groups(&self) -> TitleGroups<impl Iterator<Item = WalkItem>> {
        TitleGroups::new(self.walk())
    }

    /// Count files and groups without keeping them
    pub fn survey(&self) -> WalkSurvey {
        let mut survey = WalkSurvey::default();
        for group in self.groups().flatten() {
            survey.groups += 1;
            survey.files += group.files.len();
        }
        survey
    }
}

/// Regular files and symlinks that resolve to files become candidates.
/// Directories and symlinks to directories are passed over; symlinks that
/// resolve to nothing are reported.
fn classify_entry(root: &Path, entry: DirEntry) -> Option<WalkItem> {
    let file_type = entry.file_type();
    if file_type.is_symlink() {
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                debug!(path = %entry.path().display(), "Skipping symlink that is not a file");
                return None;
            }
            Err(e) => {
                return Some(Err(UnreadableEntry {
                    path: entry.into_path(),
                    cause: format!("broken symlink: {}", e),
                }));
            }
        }
    } else if !file_type.is_file() {
        return None;
    }
    let path = entry.into_path();
    let group = group_key(root, &path);
    Some(Ok(CandidateFile::new(root, path, group)))
}

/// The relative directory naming the title: the first `XXXX/` segment that is
/// immediately followed by a four-digit year directory. Falls back to the
/// file's own directory.
pub fn group_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel = normalize_path_to_forward_slashes(rel);
    let dirs: Vec<&str> = match rel.rsplit_once('/') {
        Some((dirs, _)) => dirs.split('/').collect(),
        None => return String::new(),
    };

    let is_title = |s: &str| s.len() == 4 && s.bytes().all(|b| b.is_ascii_alphabetic());
    let is_year = |s: &str| s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit());

    dirs.windows(2)
        .position(|w| is_title(w[0]) && is_year(w[1]))
        .map(|i| dirs[..=i].join("/"))
        .unwrap_or_else(|| dirs.join("/"))
}

/// Groups consecutive walk items by key
pub struct TitleGroups<I: Iterator<Item = WalkItem>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = WalkItem>> TitleGroups<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner: inner.peekable(),
        }
    }
}

impl<I: Iterator<Item = WalkItem>> Iterator for TitleGroups<I> {
    type Item = std::result::Result<TitleGroup, UnreadableEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.inner.next()? {
            Ok(candidate) => candidate,
            Err(e) => return Some(Err(e)),
        };
        let key = first.group.clone();
        let mut files = vec![first];
        while matches!(self.inner.peek(), Some(Ok(next)) if next.group == key) {
            if let Some(Ok(next)) = self.inner.next() {
                files.push(next);
            }
        }
        Some(Ok(TitleGroup { key, files }))
    }
}
