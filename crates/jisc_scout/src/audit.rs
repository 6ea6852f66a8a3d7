//! Audit trail
//!
//! Records accumulate in memory for the whole run and are flushed once by
//! [`AuditLog::finalize`]: a JSON-lines action log with every record in
//! order, plus one plain-text listing per category. Listings with no entries
//! are not written.

use crate::error::Result;
use crate::types::{AuditRecord, ClassificationResult, DuplicateKind, OutcomeCategory, TransferOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const ACTION_LOG: &str = "jw_actions.jsonl";
pub const UNMATCHED_LISTING: &str = "jw_unmatched.txt";
pub const IGNORED_LISTING: &str = "jw_ignored.txt";
pub const DUPLICATES_LISTING: &str = "jw_duplicates.txt";
pub const CONFLICTS_LISTING: &str = "jw_conflicts.txt";
pub const AMBIGUOUS_LISTING: &str = "jw_ambiguous.txt";
pub const FAILED_LISTING: &str = "jw_failed.txt";
pub const INVALID_LISTING: &str = "jw_invalid.txt";
pub const UNREADABLE_LISTING: &str = "jw_unreadable.txt";

/// One line destined for a category listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub file_name: &'static str,
    pub line: String,
}

impl Listing {
    pub fn new(file_name: &'static str, line: impl Into<String>) -> Self {
        Self {
            file_name,
            line: line.into(),
        }
    }
}

/// A record the audit log can persist
pub trait AuditEntry: Serialize {
    /// Listing lines this record contributes (possibly none)
    fn listings(&self) -> Vec<Listing>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingSummary {
    pub path: PathBuf,
    pub entries: usize,
}

/// What `finalize` wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub action_log: PathBuf,
    pub records: usize,
    pub listings: BTreeMap<String, ListingSummary>,
}

impl AuditReport {
    pub fn listing(&self, file_name: &str) -> Option<&ListingSummary> {
        self.listings.get(file_name)
    }
}

/// Append-only accumulator for one run
#[derive(Debug)]
pub struct AuditLog<R> {
    action_log_name: &'static str,
    records: Vec<R>,
}

impl<R: AuditEntry> AuditLog<R> {
    pub fn new(action_log_name: &'static str) -> Self {
        Self {
            action_log_name,
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the action log and the non-empty listings into `dir`.
    pub fn finalize(&self, dir: &Path) -> Result<AuditReport> {
        let action_log = dir.join(self.action_log_name);
        let mut writer = BufWriter::new(File::create(&action_log)?);
        let mut listings: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for record in &self.records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
            for listing in record.listings() {
                listings.entry(listing.file_name).or_default().push(listing.line);
            }
        }
        writer.flush()?;

        let mut report = AuditReport {
            action_log,
            records: self.records.len(),
            listings: BTreeMap::new(),
        };
        for (name, lines) in listings {
            let path = dir.join(name);
            let mut out = BufWriter::new(File::create(&path)?);
            for line in &lines {
                writeln!(out, "{}", line)?;
            }
            out.flush()?;
            info!(listing = name, entries = lines.len(), "Wrote listing");
            report.listings.insert(
                name.to_string(),
                ListingSummary {
                    path,
                    entries: lines.len(),
                },
            );
        }
        Ok(report)
    }
}

impl AuditEntry for AuditRecord {
    fn listings(&self) -> Vec<Listing> {
        let source = self.source.display().to_string();
        let mut out = Vec::new();

        match self.category() {
            OutcomeCategory::Unmatched => out.push(Listing::new(UNMATCHED_LISTING, source.clone())),
            OutcomeCategory::Ignored => out.push(Listing::new(IGNORED_LISTING, source.clone())),
            OutcomeCategory::Duplicate => {
                out.push(Listing::new(DUPLICATES_LISTING, source.clone()));
                if let Some(TransferOutcome::SkippedDuplicate {
                    existing,
                    kind: DuplicateKind::Conflicting,
                    ..
                }) = &self.transfer
                {
                    out.push(Listing::new(
                        CONFLICTS_LISTING,
                        format!("{}\t{}", source, existing.display()),
                    ));
                }
            }
            OutcomeCategory::Invalid => {
                let error = self.validation_error.as_deref().unwrap_or_default();
                out.push(Listing::new(INVALID_LISTING, format!("{}\t{}", source, error)));
            }
            OutcomeCategory::Failed => {
                let cause = match &self.transfer {
                    Some(TransferOutcome::Failed { cause }) => cause.as_str(),
                    _ => "no transfer recorded",
                };
                out.push(Listing::new(FAILED_LISTING, format!("{}\t{}", source, cause)));
            }
            OutcomeCategory::Unreadable => {
                if let ClassificationResult::Unreadable { cause } = &self.classification {
                    out.push(Listing::new(UNREADABLE_LISTING, format!("{}\t{}", source, cause)));
                }
            }
            OutcomeCategory::Copied | OutcomeCategory::SkippedDryRun => {}
        }

        if let ClassificationResult::Matched { rule, also_matched, .. }
        | ClassificationResult::Ignored { rule, also_matched, .. } = &self.classification
        {
            if !also_matched.is_empty() {
                out.push(Listing::new(
                    AMBIGUOUS_LISTING,
                    format!("{}\t{} (also {})", source, rule, also_matched.join(", ")),
                ));
            }
        }
        out
    }
}
