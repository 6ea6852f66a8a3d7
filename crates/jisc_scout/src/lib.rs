//! JISC Scout - restructuring engine for the JISC newspaper XML collection
//!
//! Walks an arbitrarily mangled input tree, classifies each file by the
//! shape of its name (or, failing that, its path), and copies matched files
//! into `<output>/<TITLE>/<YYYY>/<MM>/<DD>/<name>`. Nothing is ever
//! overwritten; every decision lands in the run's audit trail.
//!
//! A second pass, [`IdentifierRewriter`], swaps title codes for catalog
//! codes in the metadata produced from a restructured tree.

pub mod audit;
pub mod canonical;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod guard;
pub mod lookup;
pub mod rewrite;
pub mod transfer;
pub mod types;
pub mod walker;

pub use audit::{AuditEntry, AuditLog, AuditReport, Listing};
pub use canonical::CanonicalPath;
pub use catalog::{PatternCatalog, PatternRule, RuleOutcome};
pub use classifier::PathClassifier;
pub use config::{RuleConfig, RuleConfigKind, RuleTarget, WranglerConfig};
pub use context::{RunContext, RunOptions};
pub use engine::{RestructureProgress, Restructurer, RunReport, RunSummary};
pub use error::{Result, ScoutError};
pub use guard::{DuplicateGuard, GuardVerdict};
pub use lookup::TitleCodeTable;
pub use rewrite::{IdentifierRewriter, RewriteOutcome, RewriteProgress, RewriteReport, RewriteSummary};
pub use transfer::TransferExecutor;
pub use types::*;
pub use walker::{DirectoryWalker, TitleGroup, UnreadableEntry};
