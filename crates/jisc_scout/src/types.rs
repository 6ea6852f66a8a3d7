//! Core types for the restructuring engine
//!
//! A discovered file moves through
//! `Discovered → Classified → DuplicateChecked → Transferred`; every terminal
//! state is captured by an [`AuditRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalize a path to use forward slashes consistently, so that path-target
/// rules see the same shape on every platform.
pub fn normalize_path_to_forward_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Discovery
// ============================================================================

/// A file found under the input root. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Absolute (or root-joined) input path
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated
    pub rel_path: String,
    /// File name (lossy UTF-8)
    pub name: String,
    /// Title-code directory (relative) the file was discovered under
    pub group: String,
}

impl CandidateFile {
    pub fn new(input_root: &Path, path: PathBuf, group: String) -> Self {
        let rel = path.strip_prefix(input_root).unwrap_or(&path);
        let rel_path = normalize_path_to_forward_slashes(rel);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            rel_path,
            name,
            group,
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Identity fields pulled out of a file name (or, for path rules, out of the
/// trailing directory segments). Any subset may be present; the canonical
/// path builder rejects incomplete sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title_code: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Replacement output file name; `None` keeps the original name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
}

impl ExtractedFields {
    /// True when both field sets resolve to the same canonical location.
    pub fn same_destination(&self, other: &ExtractedFields) -> bool {
        let upper = |v: &Option<String>| v.as_ref().map(|s| s.to_ascii_uppercase());
        upper(&self.title_code) == upper(&other.title_code)
            && self.year == other.year
            && self.month == other.month
            && self.day == other.day
            && self.output_name == other.output_name
    }
}

/// Outcome of applying the pattern catalog to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClassificationResult {
    Matched {
        fields: ExtractedFields,
        rule: String,
        /// Lower-priority rules that also matched with a different outcome
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        also_matched: Vec<String>,
    },
    Ignored {
        reason: String,
        rule: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        also_matched: Vec<String>,
    },
    Unmatched,
    /// The walk found the entry but could not read it, so no rule was tried
    Unreadable {
        cause: String,
    },
}

impl ClassificationResult {
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::Matched { rule, .. } | Self::Ignored { rule, .. } => Some(rule),
            Self::Unmatched | Self::Unreadable { .. } => None,
        }
    }

    pub fn also_matched(&self) -> &[String] {
        match self {
            Self::Matched { also_matched, .. } | Self::Ignored { also_matched, .. } => also_matched,
            Self::Unmatched | Self::Unreadable { .. } => &[],
        }
    }
}

// ============================================================================
// Duplicates & transfers
// ============================================================================

/// Where the content occupying a canonical path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateOrigin {
    /// Present in the output tree before this run started
    PriorRun,
    /// Claimed by an earlier candidate in this run
    ThisRun,
}

/// Content comparison between a duplicate and the file it collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    Identical,
    Conflicting,
    /// One of the two files could not be hashed
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Copied,
    SkippedDryRun,
    SkippedDuplicate {
        /// File whose content already owns the canonical path
        existing: PathBuf,
        origin: DuplicateOrigin,
        kind: DuplicateKind,
    },
    Failed {
        cause: String,
    },
}

// ============================================================================
// Audit
// ============================================================================

/// Terminal state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    Copied,
    SkippedDryRun,
    Duplicate,
    Ignored,
    Unmatched,
    Invalid,
    Failed,
    Unreadable,
}

impl OutcomeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copied => "copied",
            Self::SkippedDryRun => "skipped_dry_run",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Unmatched => "unmatched",
            Self::Invalid => "invalid",
            Self::Failed => "failed",
            Self::Unreadable => "unreadable",
        }
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the restructure audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub source: PathBuf,
    pub group: String,
    pub classification: ClassificationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_path: Option<PathBuf>,
    /// Set when the extracted fields could not form a canonical path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferOutcome>,
}

impl AuditRecord {
    pub fn new(candidate: &CandidateFile, classification: ClassificationResult) -> Self {
        Self {
            timestamp: Utc::now(),
            source: candidate.path.clone(),
            group: candidate.group.clone(),
            classification,
            canonical_path: None,
            validation_error: None,
            transfer: None,
        }
    }

    /// Record for an entry the walk could not read
    pub fn unreadable(path: PathBuf, group: String, cause: String) -> Self {
        Self {
            timestamp: Utc::now(),
            source: path,
            group,
            classification: ClassificationResult::Unreadable { cause },
            canonical_path: None,
            validation_error: None,
            transfer: None,
        }
    }

    pub fn category(&self) -> OutcomeCategory {
        match (&self.classification, &self.validation_error, &self.transfer) {
            (ClassificationResult::Unreadable { .. }, _, _) => OutcomeCategory::Unreadable,
            (ClassificationResult::Ignored { .. }, _, _) => OutcomeCategory::Ignored,
            (ClassificationResult::Unmatched, _, _) => OutcomeCategory::Unmatched,
            (_, Some(_), _) => OutcomeCategory::Invalid,
            (_, None, Some(TransferOutcome::Copied)) => OutcomeCategory::Copied,
            (_, None, Some(TransferOutcome::SkippedDryRun)) => OutcomeCategory::SkippedDryRun,
            (_, None, Some(TransferOutcome::SkippedDuplicate { .. })) => OutcomeCategory::Duplicate,
            (_, None, Some(TransferOutcome::Failed { .. })) | (_, None, None) => OutcomeCategory::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str, day: &str) -> ExtractedFields {
        ExtractedFields {
            title_code: Some(title.to_string()),
            year: Some("1874".to_string()),
            month: Some("01".to_string()),
            day: Some(day.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn candidate_relative_path_uses_forward_slashes() {
        let root = Path::new("/data/JISC");
        let path = root.join("batch 1").join("WO1").join("BNWL").join("file.xml");
        let candidate = CandidateFile::new(root, path.clone(), "batch 1/WO1/BNWL".to_string());
        assert_eq!(candidate.rel_path, "batch 1/WO1/BNWL/file.xml");
        assert_eq!(candidate.name, "file.xml");
        assert_eq!(candidate.path, path);
    }

    #[test]
    fn same_destination_ignores_issue_and_case() {
        let mut a = fields("BNWL", "01");
        a.issue = Some("0001".to_string());
        let b = fields("bnwl", "01");
        assert!(a.same_destination(&b));
        assert!(!a.same_destination(&fields("BNWL", "02")));
    }

    #[test]
    fn category_follows_terminal_state() {
        let candidate = CandidateFile::new(Path::new("/in"), PathBuf::from("/in/a.xml"), String::new());
        let matched = ClassificationResult::Matched {
            fields: fields("BNWL", "01"),
            rule: "service_file".to_string(),
            also_matched: vec![],
        };

        let mut record = AuditRecord::new(&candidate, matched.clone());
        record.transfer = Some(TransferOutcome::Copied);
        assert_eq!(record.category(), OutcomeCategory::Copied);

        record.transfer = Some(TransferOutcome::SkippedDuplicate {
            existing: PathBuf::from("/out/a.xml"),
            origin: DuplicateOrigin::PriorRun,
            kind: DuplicateKind::Identical,
        });
        assert_eq!(record.category(), OutcomeCategory::Duplicate);

        let mut invalid = AuditRecord::new(&candidate, matched);
        invalid.validation_error = Some("month out of range".to_string());
        assert_eq!(invalid.category(), OutcomeCategory::Invalid);

        let unmatched = AuditRecord::new(&candidate, ClassificationResult::Unmatched);
        assert_eq!(unmatched.category(), OutcomeCategory::Unmatched);

        let unreadable = AuditRecord::unreadable(
            PathBuf::from("/in/locked"),
            String::new(),
            "Permission denied".to_string(),
        );
        assert_eq!(unreadable.category(), OutcomeCategory::Unreadable);
        assert_eq!(unreadable.classification.rule(), None);
    }

    #[test]
    fn classification_serializes_with_tag() {
        let ignored = ClassificationResult::Ignored {
            reason: "checksum sidecar".to_string(),
            rule: "sidecar".to_string(),
            also_matched: vec![],
        };
        let json = serde_json::to_value(&ignored).unwrap();
        assert_eq!(json["result"], "ignored");
        assert_eq!(json["rule"], "sidecar");
        assert!(json.get("also_matched").is_none());
    }
}
