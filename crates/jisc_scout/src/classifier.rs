//! Path classification
//!
//! Applies the pattern catalog to one candidate file. The first matching rule
//! decides the outcome; later rules are still evaluated so that a file which
//! two rules would place differently can be flagged for review.

use crate::catalog::{PatternCatalog, RuleOutcome};
use crate::types::{CandidateFile, ClassificationResult};

/// Classifies candidate files against an ordered pattern catalog
#[derive(Debug, Clone)]
pub struct PathClassifier {
    catalog: PatternCatalog,
}

impl PathClassifier {
    pub fn new(catalog: PatternCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Classify one file. Side-effect free.
    pub fn classify(&self, candidate: &CandidateFile) -> ClassificationResult {
        let mut matches = self
            .catalog
            .rules()
            .iter()
            .filter_map(|rule| rule.apply(candidate).map(|outcome| (rule.name(), outcome)));

        let Some((rule, outcome)) = matches.next() else {
            return ClassificationResult::Unmatched;
        };

        let also_matched: Vec<String> = matches
            .filter(|(_, other)| !outcome.agrees_with(other))
            .map(|(name, _)| name.to_string())
            .collect();

        match outcome {
            RuleOutcome::Extract(fields) => ClassificationResult::Matched {
                fields,
                rule: rule.to_string(),
                also_matched,
            },
            RuleOutcome::Ignore(reason) => ClassificationResult::Ignored {
                reason,
                rule: rule.to_string(),
                also_matched,
            },
        }
    }

    /// Names of every rule matching the file, in priority order
    pub fn matching_rules(&self, candidate: &CandidateFile) -> Vec<&str> {
        self.catalog
            .rules()
            .iter()
            .filter(|rule| rule.apply(candidate).is_some())
            .map(|rule| rule.name())
            .collect()
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new(PatternCatalog::builtin())
    }
}
