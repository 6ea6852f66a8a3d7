//! Output formatting for end-of-run summaries

use jisc_scout::{AuditReport, RewriteSummary, RunSummary};
use std::fmt::Write;
use std::path::Path;

/// Format milliseconds as a short human-readable duration
///
/// Examples:
/// - 850 -> "850ms"
/// - 61_500 -> "1m 1.5s"
pub fn format_elapsed(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{}m {:.1}s", ms / 60_000, (ms % 60_000) as f64 / 1_000.0)
    }
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<24} {}", label, value);
}

fn write_listings(out: &mut String, audit: &AuditReport, run_dir: &Path) {
    let _ = writeln!(out);
    let _ = writeln!(out, "Run directory: {}", run_dir.display());
    row(out, "action log", audit.action_log.display());
    for (name, listing) in &audit.listings {
        row(out, name, format!("{} entries", listing.entries));
    }
}

pub fn restructure_summary(summary: &RunSummary, audit: &AuditReport, run_dir: &Path) -> String {
    let mut out = String::new();
    let title = if summary.dry_run {
        "Restructure DRY RUN complete"
    } else {
        "Restructure complete"
    };
    let _ = writeln!(out, "{} in {}", title, format_elapsed(summary.elapsed_ms));
    row(&mut out, "files discovered", summary.discovered);
    row(&mut out, "title groups", summary.groups);
    if summary.dry_run {
        row(&mut out, "would copy", summary.skipped_dry_run);
    } else {
        row(&mut out, "copied", summary.copied);
    }
    row(
        &mut out,
        "duplicates",
        format!("{} ({} conflicting)", summary.duplicates, summary.conflicting_duplicates),
    );
    row(&mut out, "ignored", summary.ignored);
    row(&mut out, "unmatched", summary.unmatched);
    row(&mut out, "invalid", summary.invalid);
    row(&mut out, "failed", summary.failed);
    if summary.ambiguous > 0 {
        row(&mut out, "ambiguous matches", summary.ambiguous);
    }
    if summary.unreadable > 0 {
        row(&mut out, "unreadable entries", summary.unreadable);
    }
    if !summary.is_reconciled() {
        let _ = writeln!(
            out,
            "WARNING: file counts do not reconcile ({} discovered, {} accounted for)",
            summary.discovered,
            summary.accounted()
        );
    }
    write_listings(&mut out, audit, run_dir);
    out
}

pub fn rewrite_summary(summary: &RewriteSummary, audit: &AuditReport, run_dir: &Path) -> String {
    let mut out = String::new();
    let title = if summary.dry_run {
        "Identifier rewrite DRY RUN complete"
    } else {
        "Identifier rewrite complete"
    };
    let _ = writeln!(out, "{}", title);
    row(&mut out, "metadata files", summary.metadata_inputs);
    row(&mut out, "plain text files", summary.plaintext_inputs);
    if summary.dry_run {
        row(&mut out, "would rewrite", summary.skipped_dry_run);
    } else {
        row(&mut out, "rewritten", summary.rewritten);
    }
    row(&mut out, "unknown codes", summary.unknown_codes);
    row(&mut out, "failed", summary.failed);
    if summary.unreadable > 0 {
        row(&mut out, "unreadable entries", summary.unreadable);
    }
    if !summary.is_reconciled() {
        let _ = writeln!(out, "WARNING: output file counts do not match the rewritten count");
    }
    write_listings(&mut out, audit, run_dir);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn empty_audit() -> AuditReport {
        AuditReport {
            action_log: PathBuf::from("/runs/jw_1/jw_actions.jsonl"),
            records: 0,
            listings: BTreeMap::new(),
        }
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0ms");
        assert_eq!(format_elapsed(850), "850ms");
        assert_eq!(format_elapsed(1_500), "1.5s");
        assert_eq!(format_elapsed(61_500), "1m 1.5s");
    }

    #[test]
    fn dry_run_summary_says_would_copy() {
        let summary = RunSummary {
            dry_run: true,
            discovered: 3,
            skipped_dry_run: 2,
            unmatched: 1,
            ..Default::default()
        };
        let text = restructure_summary(&summary, &empty_audit(), Path::new("/runs/jw_1"));
        assert!(text.starts_with("Restructure DRY RUN complete"));
        assert!(text.contains("would copy"));
        assert!(!text.contains("WARNING"));
        assert!(text.contains("Run directory: /runs/jw_1"));
    }

    #[test]
    fn unreconciled_counts_are_flagged() {
        let summary = RunSummary {
            discovered: 3,
            copied: 1,
            outputs_after: Some(1),
            ..Default::default()
        };
        let text = restructure_summary(&summary, &empty_audit(), Path::new("/runs/jw_1"));
        assert!(text.contains("WARNING: file counts do not reconcile"));
    }

    #[test]
    fn unreadable_entries_count_toward_reconciliation() {
        let summary = RunSummary {
            discovered: 2,
            copied: 1,
            unreadable: 1,
            outputs_after: Some(1),
            ..Default::default()
        };
        let text = restructure_summary(&summary, &empty_audit(), Path::new("/runs/jw_1"));
        assert!(text.contains("unreadable entries"));
        assert!(!text.contains("WARNING"));
    }
}
