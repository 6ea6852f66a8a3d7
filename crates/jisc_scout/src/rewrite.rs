//! Identifier rewriting
//!
//! Second pass over the text-extraction output of a restructured tree. Each
//! `<name>_metadata.xml` has the `id` attribute of its `<publication>`
//! element changed from the 4-letter title code to the catalog code and its
//! XML declaration removed; the sibling `<name>.txt` is copied unchanged.
//! Everything else in the XML is kept byte for byte, so the edit is done on
//! the text rather than through a parse/serialize cycle.

use crate::audit::{AuditEntry, AuditLog, AuditReport, Listing};
use crate::context::RunContext;
use crate::error::{Result, ScoutError};
use crate::lookup::TitleCodeTable;
use crate::transfer::TransferExecutor;
use crate::types::CandidateFile;
use crate::walker::{DirectoryWalker, UnreadableEntry};
use chrono::{DateTime, NaiveDate, Utc};
use jisc_ids::{CatalogCode, TitleCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const METADATA_SUFFIX: &str = "_metadata.xml";
pub const PLAINTEXT_EXTENSION: &str = ".txt";
pub const REWRITE_ACTION_LOG: &str = "jw_alto2txt_actions.jsonl";
pub const REWRITE_FAILED_LISTING: &str = "jw_alto2txt_failed.txt";
pub const REWRITE_UNKNOWN_CODES_LISTING: &str = "jw_alto2txt_unknown_codes.txt";
pub const REWRITE_UNREADABLE_LISTING: &str = "jw_alto2txt_unreadable.txt";
pub const REWRITE_SUMMARY_FILE: &str = "jw_alto2txt_summary.json";

static XML_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A\x{FEFF}?\s*<\?xml(?s:.*?)\?>[ \t]*\r?\n?").unwrap());
static PUBLICATION_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<publication(?:\s[^>]*)?>").unwrap());
static ID_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sid\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#).unwrap());
static ISSUE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<issue(?:\s[^>]*)?>.*?<date>\s*(?P<date>\d{4}-\d{2}-\d{2})\s*</date>").unwrap()
});

/// A rewritten metadata document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenMetadata {
    pub title_code: TitleCode,
    pub catalog_code: CatalogCode,
    pub issue_date: Option<NaiveDate>,
    pub content: String,
}

/// Swap the publication id for its catalog code and drop the declaration.
pub fn rewrite_metadata_xml(content: &str, table: &TitleCodeTable) -> Result<RewrittenMetadata> {
    let body = match XML_DECLARATION.find(content) {
        Some(decl) => &content[decl.end()..],
        None => content,
    };

    let tag = PUBLICATION_TAG
        .find(body)
        .ok_or_else(|| ScoutError::MalformedMetadata("no <publication> element".to_string()))?;
    let id = ID_ATTRIBUTE
        .captures(tag.as_str())
        .and_then(|caps| caps.name("dq").or_else(|| caps.name("sq")))
        .ok_or_else(|| ScoutError::MalformedMetadata("<publication> has no id attribute".to_string()))?;

    let title_code = TitleCode::parse(id.as_str())
        .map_err(|e| ScoutError::MalformedMetadata(e.to_string()))?;

    let issue_date = match ISSUE_DATE.captures(&body[tag.end()..]) {
        Some(caps) => {
            let text = &caps["date"];
            Some(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|e| ScoutError::MalformedMetadata(format!("issue date '{}': {}", text, e)))?,
            )
        }
        None => None,
    };

    let catalog_code = table.lookup(&title_code, issue_date)?.clone();

    let start = tag.start() + id.start();
    let end = tag.start() + id.end();
    let mut rewritten = String::with_capacity(body.len() + 3);
    rewritten.push_str(&body[..start]);
    rewritten.push_str(catalog_code.as_str());
    rewritten.push_str(&body[end..]);

    Ok(RewrittenMetadata {
        title_code,
        catalog_code,
        issue_date,
        content: rewritten,
    })
}

/// `<dir>/<name>_metadata.xml` → `<dir>/<name>.txt`
pub fn companion_path(metadata_file: &Path) -> Option<PathBuf> {
    let name = metadata_file.file_name()?.to_str()?;
    let stem = name.strip_suffix(METADATA_SUFFIX)?;
    Some(metadata_file.with_file_name(format!("{}{}", stem, PLAINTEXT_EXTENSION)))
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RewriteOutcome {
    Rewritten {
        title_code: String,
        catalog_code: String,
        output: PathBuf,
        companion_output: PathBuf,
    },
    SkippedDryRun {
        title_code: String,
        catalog_code: String,
    },
    UnknownTitleCode {
        title_code: String,
    },
    NoCatalogCodeForDate {
        title_code: String,
        date: String,
    },
    Failed {
        cause: String,
    },
    /// An input entry the walk could not read; not a metadata input
    Unreadable {
        cause: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRecord {
    pub timestamp: DateTime<Utc>,
    pub metadata_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: RewriteOutcome,
}

impl AuditEntry for RewriteRecord {
    fn listings(&self) -> Vec<Listing> {
        let path = self.metadata_file.display();
        match &self.outcome {
            RewriteOutcome::UnknownTitleCode { title_code } => {
                vec![Listing::new(REWRITE_UNKNOWN_CODES_LISTING, format!("{}\t{}", path, title_code))]
            }
            RewriteOutcome::NoCatalogCodeForDate { title_code, date } => vec![Listing::new(
                REWRITE_UNKNOWN_CODES_LISTING,
                format!("{}\t{}\t{}", path, title_code, date),
            )],
            RewriteOutcome::Failed { cause } => {
                vec![Listing::new(REWRITE_FAILED_LISTING, format!("{}\t{}", path, cause))]
            }
            RewriteOutcome::Unreadable { cause } => {
                vec![Listing::new(REWRITE_UNREADABLE_LISTING, format!("{}\t{}", path, cause))]
            }
            RewriteOutcome::Rewritten { .. } | RewriteOutcome::SkippedDryRun { .. } => Vec::new(),
        }
    }
}

// ============================================================================
// Run
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteProgress {
    Started { total_files: usize },
    FileDone,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteSummary {
    pub dry_run: bool,
    pub metadata_inputs: usize,
    pub plaintext_inputs: usize,
    pub rewritten: usize,
    pub skipped_dry_run: usize,
    pub unknown_codes: usize,
    pub failed: usize,
    pub unreadable: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_outputs: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext_outputs: Option<usize>,
}

impl RewriteSummary {
    /// Every metadata file has an outcome, and a live run wrote one XML and
    /// one text file per rewritten pair. Unreadable entries are audited on
    /// their own and are not metadata inputs.
    pub fn is_reconciled(&self) -> bool {
        let handled = self.rewritten + self.skipped_dry_run + self.unknown_codes + self.failed;
        let outputs_ok = match (self.metadata_outputs, self.plaintext_outputs) {
            (Some(xml), Some(txt)) => xml == self.rewritten && txt == self.rewritten,
            _ => true,
        };
        handled == self.metadata_inputs && outputs_ok
    }

    fn count(&mut self, outcome: &RewriteOutcome) {
        match outcome {
            RewriteOutcome::Rewritten { .. } => self.rewritten += 1,
            RewriteOutcome::SkippedDryRun { .. } => self.skipped_dry_run += 1,
            RewriteOutcome::UnknownTitleCode { .. } | RewriteOutcome::NoCatalogCodeForDate { .. } => {
                self.unknown_codes += 1
            }
            RewriteOutcome::Failed { .. } => self.failed += 1,
            RewriteOutcome::Unreadable { .. } => self.unreadable += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RewriteReport {
    pub summary: RewriteSummary,
    pub audit: AuditReport,
    pub summary_path: PathBuf,
}

/// Rewrites every metadata/text pair under the input root
pub struct IdentifierRewriter<'a> {
    ctx: &'a RunContext,
    table: &'a TitleCodeTable,
    executor: TransferExecutor,
    audit: AuditLog<RewriteRecord>,
    progress: Option<mpsc::Sender<RewriteProgress>>,
}

impl<'a> IdentifierRewriter<'a> {
    pub fn new(ctx: &'a RunContext, table: &'a TitleCodeTable) -> Self {
        Self {
            ctx,
            table,
            executor: TransferExecutor::new(),
            audit: AuditLog::new(REWRITE_ACTION_LOG),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<RewriteProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn send(&self, event: RewriteProgress) {
        if let Some(ref tx) = self.progress {
            let _ = tx.send(event);
        }
    }

    /// Rewrite one metadata file and copy its companion. Failures are
    /// returned as outcomes, never raised.
    pub fn rewrite(&mut self, metadata_file: &CandidateFile) -> RewriteRecord {
        let companion = companion_path(&metadata_file.path);
        let outcome = match self.rewrite_pair(metadata_file, companion.as_deref()) {
            Ok(outcome) => outcome,
            Err(ScoutError::UnknownTitleCode(title_code)) => {
                warn!(path = %metadata_file.path.display(), title_code = %title_code, "Unknown title code");
                RewriteOutcome::UnknownTitleCode { title_code }
            }
            Err(ScoutError::NoCatalogCodeForDate { title_code, date }) => {
                warn!(path = %metadata_file.path.display(), title_code = %title_code, date = %date, "No catalog code for issue date");
                RewriteOutcome::NoCatalogCodeForDate { title_code, date }
            }
            Err(e) => {
                warn!(path = %metadata_file.path.display(), error = %e, "Rewrite failed");
                RewriteOutcome::Failed { cause: e.to_string() }
            }
        };
        RewriteRecord {
            timestamp: Utc::now(),
            metadata_file: metadata_file.path.clone(),
            companion,
            outcome,
        }
    }

    fn rewrite_pair(&mut self, metadata_file: &CandidateFile, companion: Option<&Path>) -> Result<RewriteOutcome> {
        let companion = companion
            .filter(|p| p.is_file())
            .ok_or_else(|| ScoutError::MissingCompanion(metadata_file.path.display().to_string()))?;

        let content = fs::read_to_string(&metadata_file.path)?;
        let rewritten = rewrite_metadata_xml(&content, self.table)?;

        if self.ctx.dry_run {
            debug!(path = %metadata_file.path.display(), catalog_code = %rewritten.catalog_code, "Dry run: would rewrite");
            return Ok(RewriteOutcome::SkippedDryRun {
                title_code: rewritten.title_code.to_string(),
                catalog_code: rewritten.catalog_code.to_string(),
            });
        }

        let output = self.ctx.output_root.join(&metadata_file.rel_path);
        let companion_rel = companion.strip_prefix(&self.ctx.input_root).unwrap_or(companion);
        let companion_output = self.ctx.output_root.join(companion_rel);

        let written = self.executor.write_bytes(&output, rewritten.content.as_bytes())?;
        if let Err(e) = self.executor.copy_file(companion, &companion_output) {
            // A pair is written whole or not at all
            if let Err(cleanup) = self.executor.discard(&output, written) {
                error!(path = %output.display(), error = %cleanup, "Could not remove rewritten metadata");
            }
            return Err(e.into());
        }
        debug!(
            path = %metadata_file.path.display(),
            title_code = %rewritten.title_code,
            catalog_code = %rewritten.catalog_code,
            "Rewrote metadata"
        );

        Ok(RewriteOutcome::Rewritten {
            title_code: rewritten.title_code.to_string(),
            catalog_code: rewritten.catalog_code.to_string(),
            output,
            companion_output,
        })
    }

    /// Process every metadata file, then write the audit trail and summary.
    pub fn run(mut self) -> Result<RewriteReport> {
        let ctx = self.ctx;
        info!(input = %ctx.input_root.display(), "Input directory");
        info!(output = %ctx.output_root.display(), "Output directory");
        info!(working = %ctx.working_dir.display(), "Working directory");
        if ctx.dry_run {
            info!("Executing a DRY RUN");
        }

        let walker = DirectoryWalker::new(&ctx.input_root);
        let mut summary = RewriteSummary {
            dry_run: ctx.dry_run,
            ..Default::default()
        };
        let mut metadata_files = Vec::new();
        for candidate in walker.walk() {
            match candidate {
                Ok(c) if c.name.ends_with(METADATA_SUFFIX) => metadata_files.push(c),
                Ok(c) if c.name.ends_with(PLAINTEXT_EXTENSION) => summary.plaintext_inputs += 1,
                Ok(c) => debug!(path = %c.path.display(), "Not a metadata or text file"),
                Err(entry) => {
                    let record = unreadable_record(entry);
                    summary.count(&record.outcome);
                    self.audit.record(record);
                }
            }
        }
        summary.metadata_inputs = metadata_files.len();
        info!(
            metadata = summary.metadata_inputs,
            plaintext = summary.plaintext_inputs,
            "Discovered input files"
        );
        if summary.metadata_inputs != summary.plaintext_inputs {
            warn!(
                metadata = summary.metadata_inputs,
                plaintext = summary.plaintext_inputs,
                "Input metadata and text file counts differ"
            );
        }

        self.send(RewriteProgress::Started {
            total_files: metadata_files.len(),
        });
        for file in &metadata_files {
            let record = self.rewrite(file);
            summary.count(&record.outcome);
            self.audit.record(record);
            self.send(RewriteProgress::FileDone);
        }

        if !ctx.dry_run {
            let (xml, txt) = count_outputs(&ctx.output_root);
            summary.metadata_outputs = Some(xml);
            summary.plaintext_outputs = Some(txt);
        }

        let audit = self.audit.finalize(&ctx.working_dir)?;
        let summary_path = ctx.working_dir.join(REWRITE_SUMMARY_FILE);
        serde_json::to_writer_pretty(BufWriter::new(File::create(&summary_path)?), &summary)?;

        if summary.is_reconciled() {
            info!(
                rewritten = summary.rewritten,
                unknown_codes = summary.unknown_codes,
                failed = summary.failed,
                "Run complete"
            );
        } else {
            error!(
                metadata_inputs = summary.metadata_inputs,
                rewritten = summary.rewritten,
                metadata_outputs = ?summary.metadata_outputs,
                plaintext_outputs = ?summary.plaintext_outputs,
                "File counts do not reconcile"
            );
        }

        Ok(RewriteReport {
            summary,
            audit,
            summary_path,
        })
    }
}

fn unreadable_record(entry: UnreadableEntry) -> RewriteRecord {
    warn!(path = %entry.path.display(), cause = %entry.cause, "Unreadable entry");
    RewriteRecord {
        timestamp: Utc::now(),
        metadata_file: entry.path,
        companion: None,
        outcome: RewriteOutcome::Unreadable { cause: entry.cause },
    }
}

fn count_outputs(root: &Path) -> (usize, usize) {
    let mut xml = 0;
    let mut txt = 0;
    for candidate in DirectoryWalker::new(root).walk().flatten() {
        if candidate.name.ends_with(METADATA_SUFFIX) {
            xml += 1;
        } else if candidate.name.ends_with(PLAINTEXT_EXTENSION) {
            txt += 1;
        }
    }
    (xml, txt)
}
