//! Restructure run loop
//!
//! One file at a time, in walk order:
//! classify → build canonical path → duplicate check → transfer → audit.
//! Per-file problems are recorded and the loop moves on; only errors writing
//! the run's own artifacts end a run early.

use crate::audit::{AuditLog, AuditReport, ACTION_LOG};
use crate::canonical;
use crate::classifier::PathClassifier;
use crate::context::RunContext;
use crate::error::Result;
use crate::guard::{DuplicateGuard, GuardVerdict};
use crate::transfer::{count_files, TransferExecutor};
use crate::types::{AuditRecord, CandidateFile, ClassificationResult, DuplicateKind, OutcomeCategory, TransferOutcome};
use crate::walker::{group_key, DirectoryWalker, UnreadableEntry};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const SUMMARY_FILE: &str = "jw_summary.json";

/// Progress events for a restructure run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestructureProgress {
    Started { total_files: usize, total_groups: usize },
    GroupDone { key: String, files: usize },
}

/// Counts for one run, with the reconciliation check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub discovered: usize,
    pub groups: usize,
    pub copied: usize,
    pub skipped_dry_run: usize,
    pub duplicates: usize,
    pub conflicting_duplicates: usize,
    pub ignored: usize,
    pub unmatched: usize,
    pub invalid: usize,
    pub failed: usize,
    pub ambiguous: usize,
    pub unreadable: usize,
    pub outputs_before: usize,
    /// Not counted on dry runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs_after: Option<usize>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Entries that reached a terminal state
    pub fn accounted(&self) -> usize {
        self.copied
            + self.skipped_dry_run
            + self.duplicates
            + self.ignored
            + self.unmatched
            + self.invalid
            + self.failed
            + self.unreadable
    }

    /// Every discovered entry has exactly one outcome, and on a live run the
    /// output tree grew by exactly the number of copies.
    pub fn is_reconciled(&self) -> bool {
        let outputs_ok = match self.outputs_after {
            Some(after) => after.checked_sub(self.outputs_before) == Some(self.copied),
            None => true,
        };
        self.discovered == self.accounted() && outputs_ok
    }

    fn count(&mut self, record: &AuditRecord) {
        self.discovered += 1;
        match record.category() {
            OutcomeCategory::Copied => self.copied += 1,
            OutcomeCategory::SkippedDryRun => self.skipped_dry_run += 1,
            OutcomeCategory::Duplicate => {
                self.duplicates += 1;
                if let Some(TransferOutcome::SkippedDuplicate {
                    kind: DuplicateKind::Conflicting,
                    ..
                }) = record.transfer
                {
                    self.conflicting_duplicates += 1;
                }
            }
            OutcomeCategory::Ignored => self.ignored += 1,
            OutcomeCategory::Unmatched => self.unmatched += 1,
            OutcomeCategory::Invalid => self.invalid += 1,
            OutcomeCategory::Failed => self.failed += 1,
            OutcomeCategory::Unreadable => self.unreadable += 1,
        }
        if !record.classification.also_matched().is_empty() {
            self.ambiguous += 1;
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub audit: AuditReport,
    pub summary_path: PathBuf,
}

/// Drives a restructure run over a prepared context
pub struct Restructurer<'a> {
    ctx: &'a RunContext,
    classifier: PathClassifier,
    guard: DuplicateGuard,
    executor: TransferExecutor,
    audit: AuditLog<AuditRecord>,
    progress: Option<mpsc::Sender<RestructureProgress>>,
}

impl<'a> Restructurer<'a> {
    pub fn new(ctx: &'a RunContext, classifier: PathClassifier) -> Self {
        Self {
            ctx,
            classifier,
            guard: DuplicateGuard::new(),
            executor: TransferExecutor::new(),
            audit: AuditLog::new(ACTION_LOG),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<RestructureProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn send(&self, event: RestructureProgress) {
        if let Some(ref tx) = self.progress {
            let _ = tx.send(event);
        }
    }

    /// Process every file under the input root, then write the audit trail
    /// and summary into the run directory.
    pub fn run(mut self) -> Result<RunReport> {
        let start = Instant::now();
        let ctx = self.ctx;
        info!(input = %ctx.input_root.display(), "Input directory");
        info!(output = %ctx.output_root.display(), "Output directory");
        info!(working = %ctx.working_dir.display(), "Working directory");
        if ctx.dry_run {
            info!("Executing a DRY RUN");
        }

        let mut summary = RunSummary {
            dry_run: ctx.dry_run,
            outputs_before: count_files(&ctx.output_root),
            ..Default::default()
        };

        let walker = DirectoryWalker::new(&ctx.input_root);
        let survey = walker.survey();
        info!(files = survey.files, groups = survey.groups, "Discovered input files");
        self.send(RestructureProgress::Started {
            total_files: survey.files,
            total_groups: survey.groups,
        });

        for group in walker.groups() {
            let group = match group {
                Ok(group) => group,
                Err(entry) => {
                    let record = self.unreadable(entry);
                    summary.count(&record);
                    self.audit.record(record);
                    continue;
                }
            };
            debug!(group = %group.key, files = group.files.len(), "Processing title group");
            summary.groups += 1;
            for candidate in &group.files {
                let record = self.process_file(candidate);
                summary.count(&record);
                self.audit.record(record);
            }
            self.send(RestructureProgress::GroupDone {
                key: group.key.clone(),
                files: group.files.len(),
            });
        }

        if !ctx.dry_run {
            summary.outputs_after = Some(count_files(&ctx.output_root));
        }
        summary.elapsed_ms = start.elapsed().as_millis() as u64;

        let audit = self.audit.finalize(&ctx.working_dir)?;
        let summary_path = ctx.working_dir.join(SUMMARY_FILE);
        serde_json::to_writer_pretty(BufWriter::new(File::create(&summary_path)?), &summary)?;

        if summary.is_reconciled() {
            info!(
                discovered = summary.discovered,
                copied = summary.copied,
                duplicates = summary.duplicates,
                ignored = summary.ignored,
                unmatched = summary.unmatched,
                "Run complete"
            );
        } else {
            error!(
                discovered = summary.discovered,
                accounted = summary.accounted(),
                outputs_before = summary.outputs_before,
                outputs_after = ?summary.outputs_after,
                copied = summary.copied,
                "File counts do not reconcile"
            );
        }

        Ok(RunReport {
            summary,
            audit,
            summary_path,
        })
    }

    fn unreadable(&self, entry: UnreadableEntry) -> AuditRecord {
        warn!(path = %entry.path.display(), cause = %entry.cause, "Unreadable entry");
        let group = group_key(&self.ctx.input_root, &entry.path);
        AuditRecord::unreadable(entry.path, group, entry.cause)
    }

    /// Take one file to a terminal state.
    pub fn process_file(&mut self, candidate: &CandidateFile) -> AuditRecord {
        let classification = self.classifier.classify(candidate);
        let mut record = AuditRecord::new(candidate, classification);

        match &record.classification {
            ClassificationResult::Unmatched => {
                info!(path = %candidate.path.display(), "No pattern matched");
            }
            ClassificationResult::Ignored { rule, reason, .. } => {
                debug!(path = %candidate.path.display(), rule = %rule, reason = %reason, "Ignored");
            }
            ClassificationResult::Unreadable { .. } => {}
            ClassificationResult::Matched { fields, rule, .. } => {
                match canonical::build(fields, &candidate.name, &self.ctx.output_root) {
                    Err(e) => {
                        warn!(path = %candidate.path.display(), rule = %rule, error = %e, "Extracted fields rejected");
                        record.validation_error = Some(e.to_string());
                    }
                    Ok(target) => {
                        let outcome = match self.guard.check(&target, &candidate.path) {
                            GuardVerdict::Duplicate { existing, origin, kind } => {
                                if kind == DuplicateKind::Conflicting {
                                    warn!(
                                        path = %candidate.path.display(),
                                        existing = %existing.display(),
                                        "Duplicate with different content"
                                    );
                                } else {
                                    info!(path = %candidate.path.display(), existing = %existing.display(), "Duplicate");
                                }
                                TransferOutcome::SkippedDuplicate { existing, origin, kind }
                            }
                            GuardVerdict::Fresh => {
                                let outcome = self.executor.transfer(candidate, &target, self.ctx.dry_run);
                                if matches!(outcome, TransferOutcome::Copied | TransferOutcome::SkippedDryRun) {
                                    self.guard.claim(&target, &candidate.path);
                                }
                                outcome
                            }
                        };
                        record.canonical_path = Some(target.path);
                        record.transfer = Some(outcome);
                    }
                }
            }
        }

        if let Some(rule) = record.classification.rule() {
            let also = record.classification.also_matched();
            if !also.is_empty() {
                warn!(
                    path = %candidate.path.display(),
                    rule = %rule,
                    also_matched = %also.join(", "),
                    "File matches rules that disagree"
                );
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn prepare(temp: &TempDir, dry_run: bool) -> RunContext {
        RunContext::prepare(RunOptions {
            input_root: temp.path().join("in"),
            output_root: temp.path().join("out"),
            working_root: temp.path().join("work"),
            dry_run,
            debug: false,
        })
        .unwrap()
    }

    #[test]
    fn summary_reconciles() {
        let mut summary = RunSummary {
            discovered: 3,
            copied: 1,
            duplicates: 1,
            unmatched: 1,
            outputs_before: 2,
            outputs_after: Some(3),
            ..Default::default()
        };
        assert!(summary.is_reconciled());
        summary.outputs_after = Some(4);
        assert!(!summary.is_reconciled());
        summary.outputs_after = None;
        summary.discovered = 4;
        assert!(!summary.is_reconciled());
    }

    #[test]
    fn run_restructures_and_reports() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        touch(&input, "0001_x/WO1/BNWL/1874/01/01/service/WO1_BNWL_1874_01_01-0001-001.xml", "<p1/>");
        touch(&input, "0001_x/WO1/BNWL/1874/01/01/service/WO1_BNWL_1874_01_01-0001-001.xml.md5", "abc");
        touch(&input, "misc/readme.txt", "hello");
        let ctx = prepare(&temp, false);

        let (tx, rx) = mpsc::channel();
        let report = Restructurer::new(&ctx, PathClassifier::default())
            .with_progress(tx)
            .run()
            .unwrap();

        let s = &report.summary;
        assert_eq!(s.discovered, 3);
        assert_eq!(s.copied, 1);
        assert_eq!(s.ignored, 1);
        assert_eq!(s.unmatched, 1);
        assert!(s.is_reconciled());
        assert!(ctx
            .output_root
            .join("BNWL/1874/01/01/WO1_BNWL_1874_01_01-0001-001.xml")
            .is_file());
        assert!(report.summary_path.is_file());

        let events: Vec<RestructureProgress> = rx.try_iter().collect();
        assert_eq!(
            events[0],
            RestructureProgress::Started {
                total_files: 3,
                total_groups: 2
            }
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn invalid_fields_are_recorded_not_fatal() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        touch(&input, "x/WO1_BNWL_1874_13_01-0001-001.xml", "<bad month/>");
        touch(&input, "x/WO1_BNWL_1874_12_01-0001-001.xml", "<good/>");
        let ctx = prepare(&temp, false);

        let report = Restructurer::new(&ctx, PathClassifier::default()).run().unwrap();
        assert_eq!(report.summary.invalid, 1);
        assert_eq!(report.summary.copied, 1);
        assert!(report.audit.listing(crate::audit::INVALID_LISTING).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_audited_and_reconciled() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in");
        touch(&input, "x/WO1_BNWL_1874_12_01-0001-001.xml", "<good/>");
        std::os::unix::fs::symlink(temp.path().join("gone.xml"), input.join("x/lost.xml")).unwrap();
        let ctx = prepare(&temp, false);

        let report = Restructurer::new(&ctx, PathClassifier::default()).run().unwrap();
        let s = &report.summary;
        assert_eq!(s.discovered, 2);
        assert_eq!(s.copied, 1);
        assert_eq!(s.unreadable, 1);
        assert!(s.is_reconciled());

        let listing = fs::read_to_string(ctx.working_dir.join(crate::audit::UNREADABLE_LISTING)).unwrap();
        assert!(listing.starts_with(&format!("{}\t", ctx.input_root.join("x/lost.xml").display())));
        let actions = fs::read_to_string(&report.audit.action_log).unwrap();
        assert!(actions.lines().any(|l| l.contains("\"result\":\"unreadable\"")));
    }
}
