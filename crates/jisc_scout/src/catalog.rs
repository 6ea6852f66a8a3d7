//! Pattern catalog
//!
//! An ordered table of compiled rules. Each rule is a regex over either the
//! file name or the `/`-normalised relative path, paired with an action:
//! extract identity fields, or ignore the file with a reason. Rules never
//! change after construction; new layouts are supported by appending rules.

use crate::config::{RuleConfig, RuleConfigKind, RuleTarget, WranglerConfig};
use crate::error::{Result, ScoutError};
use crate::types::{CandidateFile, ExtractedFields};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Turns the captures of a matching rule into identity fields.
pub type ExtractFn = fn(&Captures<'_>) -> ExtractedFields;

/// Capture groups every extract rule must define.
pub const REQUIRED_GROUPS: [&str; 4] = ["title", "year", "month", "day"];

#[derive(Clone)]
pub enum RuleAction {
    Extract(ExtractFn),
    Ignore(String),
}

/// What a rule produced for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Extract(ExtractedFields),
    Ignore(String),
}

impl RuleOutcome {
    /// Two outcomes agree when they lead to the same terminal state.
    pub fn agrees_with(&self, other: &RuleOutcome) -> bool {
        match (self, other) {
            (Self::Extract(a), Self::Extract(b)) => a.same_destination(b),
            (Self::Ignore(_), Self::Ignore(_)) => true,
            _ => false,
        }
    }
}

/// A compiled pattern rule
#[derive(Clone)]
pub struct PatternRule {
    name: String,
    target: RuleTarget,
    regex: Regex,
    action: RuleAction,
}

impl std::fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("pattern", &self.regex.as_str())
            .finish()
    }
}

impl PatternRule {
    /// Create an extract rule; the pattern must define [`REQUIRED_GROUPS`].
    pub fn extract(name: &str, target: RuleTarget, pattern: &str, extractor: ExtractFn) -> Result<Self> {
        let regex = compile(name, pattern)?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(missing) = REQUIRED_GROUPS.iter().find(|g| !names.contains(g)) {
            return Err(ScoutError::Pattern(format!(
                "rule '{}' has no capture group named '{}'",
                name, missing
            )));
        }
        Ok(Self {
            name: name.to_string(),
            target,
            regex,
            action: RuleAction::Extract(extractor),
        })
    }

    /// Create an ignore rule
    pub fn ignore(name: &str, target: RuleTarget, pattern: &str, reason: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            target,
            regex: compile(name, pattern)?,
            action: RuleAction::Ignore(reason.to_string()),
        })
    }

    /// Build a rule from a `[[extra_rules]]` config entry
    pub fn from_config(config: &RuleConfig) -> Result<Self> {
        match config.kind {
            RuleConfigKind::Extract => {
                Self::extract(&config.name, config.target, &config.pattern, named_groups)
            }
            RuleConfigKind::Ignore => {
                let reason = config
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("matched rule {}", config.name));
                Self::ignore(&config.name, config.target, &config.pattern, &reason)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> RuleTarget {
        self.target
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self.action, RuleAction::Ignore(_))
    }

    /// Apply the rule to a file; `None` when the pattern does not match.
    pub fn apply(&self, candidate: &CandidateFile) -> Option<RuleOutcome> {
        let haystack = match self.target {
            RuleTarget::Name => candidate.name.as_str(),
            RuleTarget::Path => candidate.rel_path.as_str(),
        };
        match &self.action {
            RuleAction::Ignore(reason) => self
                .regex
                .is_match(haystack)
                .then(|| RuleOutcome::Ignore(reason.clone())),
            RuleAction::Extract(extractor) => self
                .regex
                .captures(haystack)
                .map(|caps| RuleOutcome::Extract(extractor(&caps))),
        }
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ScoutError::Pattern(format!("rule '{}': {}", name, e)))
}

// ============================================================================
// Extractors
// ============================================================================

fn group(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

/// Read the standard named groups; the title code is upper-cased.
pub fn named_groups(caps: &Captures<'_>) -> ExtractedFields {
    ExtractedFields {
        title_code: group(caps, "title").map(|t| t.to_ascii_uppercase()),
        year: group(caps, "year"),
        month: group(caps, "month"),
        day: group(caps, "day"),
        issue: group(caps, "issue"),
        page: group(caps, "page"),
        output_name: None,
    }
}

/// Five-letter title codes carry a stray fifth letter. Drop it from the
/// title code and from the file name.
fn anomalous_title(caps: &Captures<'_>) -> ExtractedFields {
    let mut fields = named_groups(caps);
    if let (Some(whole), Some(title)) = (caps.get(0), caps.name("title")) {
        let stray = title.start() - whole.start() + 4;
        let name = whole.as_str();
        let fixed = format!("{}{}", &name[..stray], &name[stray + 1..]);
        fields.title_code = Some(title.as_str()[..4].to_ascii_uppercase());
        fields.output_name = Some(fixed);
    }
    fields
}

// ============================================================================
// Built-in rules
// ============================================================================

const OS_MAPS: &str = r"OSMaps.*?(\.shp|/metadata)\.xml$";
const SIDECAR: &str = r"(?i)^(?:.*\.(?:md5|sha1|sha256|chk)|\.ds_store|thumbs\.db|desktop\.ini|\._.*)$";
const SERVICE_FILE: &str = r"(?i)^(?P<series>[a-z0-9]+)_(?P<title>[a-z]{4})_(?P<year>\d{4})_(?P<month>\d{2})_(?P<day>\d{2})-(?P<issue>\d{4})(?:-(?P<page>\d{3}))?\.xml$";
const SUBDAY_FILE: &str = r"(?i)^(?P<series>[a-z0-9]+)_(?P<title>[a-z]{4})_(?P<year>\d{4})_(?P<month>\d{2})_(?P<day>\d{2})_[sv]-(?P<issue>\d{4})(?:-(?P<page>\d{3}))?\.xml$";
const LSIDYV_FILE: &str = r"^(?P<title>[A-Z]{4})-(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})[^.]*\.xml$";
const LSIDYV_ANOMALY: &str = r"^(?P<title>[A-Z]{5})-(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})[^.]*\.xml$";
const DATED_DIRECTORY: &str = r"(?i)(?:^|/)(?P<title>[a-z]{4})/(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})(?:_[sv])?/(?:service|master)/[^/]+$";

static BUILTIN_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    vec![
        PatternRule::ignore("os_maps", RuleTarget::Path, OS_MAPS, "Ordnance Survey map file").unwrap(),
        PatternRule::ignore("sidecar", RuleTarget::Name, SIDECAR, "checksum or OS metadata sidecar").unwrap(),
        PatternRule::extract("service_file", RuleTarget::Name, SERVICE_FILE, named_groups).unwrap(),
        PatternRule::extract("subday_file", RuleTarget::Name, SUBDAY_FILE, named_groups).unwrap(),
        PatternRule::extract("lsidyv_file", RuleTarget::Name, LSIDYV_FILE, named_groups).unwrap(),
        PatternRule::extract("lsidyv_anomaly", RuleTarget::Name, LSIDYV_ANOMALY, anomalous_title).unwrap(),
        PatternRule::extract("dated_directory", RuleTarget::Path, DATED_DIRECTORY, named_groups).unwrap(),
    ]
});

/// Ordered rule table consulted by the classifier
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    rules: Vec<PatternRule>,
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PatternCatalog {
    /// The built-in rules only
    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
        }
    }

    /// Built-in rules followed by the configured extensions
    pub fn with_config(config: &WranglerConfig) -> Result<Self> {
        let mut catalog = Self::builtin();
        if !config.extra_sidecar_names.is_empty() {
            let alternatives: Vec<String> = config
                .extra_sidecar_names
                .iter()
                .map(|n| regex::escape(n))
                .collect();
            let pattern = format!("(?i)^(?:{})$", alternatives.join("|"));
            catalog.push(PatternRule::ignore(
                "extra_sidecar",
                RuleTarget::Name,
                &pattern,
                "configured sidecar name",
            )?);
        }
        for rule in &config.extra_rules {
            if catalog.rules.iter().any(|r| r.name == rule.name) {
                return Err(ScoutError::Config(format!("duplicate rule name '{}'", rule.name)));
            }
            catalog.push(PatternRule::from_config(rule)?);
        }
        Ok(catalog)
    }

    /// Append a rule with the lowest priority
    pub fn push(&mut self, rule: PatternRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn candidate(rel: &str) -> CandidateFile {
        let root = Path::new("/in");
        CandidateFile::new(root, root.join(rel), String::new())
    }

    fn rule(name: &str) -> PatternRule {
        PatternCatalog::builtin()
            .rules()
            .iter()
            .find(|r| r.name() == name)
            .cloned()
            .unwrap()
    }

    fn extracted(rule_name: &str, rel: &str) -> ExtractedFields {
        match rule(rule_name).apply(&candidate(rel)) {
            Some(RuleOutcome::Extract(fields)) => fields,
            other => panic!("{} did not extract from {}: {:?}", rule_name, rel, other),
        }
    }

    #[test]
    fn builtin_order_is_fixed() {
        let catalog = PatternCatalog::builtin();
        let names: Vec<&str> = catalog.rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "os_maps",
                "sidecar",
                "service_file",
                "subday_file",
                "lsidyv_file",
                "lsidyv_anomaly",
                "dated_directory"
            ]
        );
    }

    #[test]
    fn service_file_fields() {
        let fields = extracted("service_file", "x/y/WO1_BNWL_1874_01_01-0001-001.xml");
        assert_eq!(fields.title_code.as_deref(), Some("BNWL"));
        assert_eq!(fields.year.as_deref(), Some("1874"));
        assert_eq!(fields.month.as_deref(), Some("01"));
        assert_eq!(fields.day.as_deref(), Some("01"));
        assert_eq!(fields.issue.as_deref(), Some("0001"));
        assert_eq!(fields.page.as_deref(), Some("001"));
        assert!(fields.output_name.is_none());
    }

    #[test]
    fn service_file_without_page_is_issue_level() {
        let fields = extracted("service_file", "mangled dir/WO1_BNWL_1874_01_01-0001.xml");
        assert_eq!(fields.title_code.as_deref(), Some("BNWL"));
        assert_eq!(fields.issue.as_deref(), Some("0001"));
        assert!(fields.page.is_none());
        assert!(rule("service_file")
            .apply(&candidate("WO1_BNWL_1874_01_01-0001-01.xml"))
            .is_none());
    }

    #[test]
    fn service_file_uppercases_title() {
        let fields = extracted("service_file", "wo1_bnwl_1874_01_01-0001-001.xml");
        assert_eq!(fields.title_code.as_deref(), Some("BNWL"));
    }

    #[test]
    fn subday_file_drops_subscript() {
        let fields = extracted("subday_file", "WO1_LEMR_1873_01_04_S-0001.xml");
        assert_eq!(fields.title_code.as_deref(), Some("LEMR"));
        assert_eq!(fields.day.as_deref(), Some("04"));
        assert!(fields.page.is_none());

        let fields = extracted("subday_file", "WO1_LEMR_1873_01_04_v-0002-003.xml");
        assert_eq!(fields.page.as_deref(), Some("003"));
    }

    #[test]
    fn lsidyv_file_with_suffix() {
        let fields = extracted("lsidyv_file", "lsidyv1a2b3c/MOPT/IMTS-1877-10-13_mets.xml");
        assert_eq!(fields.title_code.as_deref(), Some("IMTS"));
        assert_eq!(fields.month.as_deref(), Some("10"));
        assert!(rule("lsidyv_file").apply(&candidate("mopt-1861-12-05.xml")).is_none());
    }

    #[test]
    fn anomaly_drops_fifth_letter() {
        let fields = extracted("lsidyv_anomaly", "a/MOPTX-1861-12-05.xml");
        assert_eq!(fields.title_code.as_deref(), Some("MOPT"));
        assert_eq!(fields.output_name.as_deref(), Some("MOPT-1861-12-05.xml"));
    }

    #[test]
    fn dated_directory_reads_path() {
        let fields = extracted("dated_directory", "batch/BNWL/1874/02/03_S/master/page one.xml");
        assert_eq!(fields.title_code.as_deref(), Some("BNWL"));
        assert_eq!(fields.month.as_deref(), Some("02"));
        assert_eq!(fields.day.as_deref(), Some("03"));
        assert!(rule("dated_directory").apply(&candidate("BNWL/1874/02/03/other/p.xml")).is_none());
    }

    #[test]
    fn ignore_rules() {
        for rel in ["a/b.xml.md5", "a/.DS_Store", "Thumbs.db", "x/._WO1_BNWL.xml"] {
            assert!(
                matches!(rule("sidecar").apply(&candidate(rel)), Some(RuleOutcome::Ignore(_))),
                "{}",
                rel
            );
        }
        assert!(rule("os_maps").apply(&candidate("OSMaps/sheet12/metadata.xml")).is_some());
        assert!(rule("os_maps").apply(&candidate("OSMaps/sheet12.shp.xml")).is_some());
        assert!(rule("os_maps").apply(&candidate("maps/sheet12.xml")).is_none());
    }

    #[test]
    fn extract_rule_requires_groups() {
        let err = PatternRule::extract("bad", RuleTarget::Name, r"^(?P<title>\w{4})\.xml$", named_groups)
            .unwrap_err();
        assert!(err.to_string().contains("year"));

        let err = PatternRule::ignore("broken", RuleTarget::Name, "(", "x").unwrap_err();
        assert!(matches!(err, ScoutError::Pattern(_)));
    }

    #[test]
    fn config_rules_are_appended() {
        let config = WranglerConfig {
            extra_sidecar_names: vec!["index.lst".to_string()],
            extra_rules: vec![RuleConfig {
                name: "compact_date".to_string(),
                kind: RuleConfigKind::Extract,
                target: RuleTarget::Name,
                pattern: r"^(?P<title>[A-Z]{4})_(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})\.xml$".to_string(),
                reason: None,
            }],
            ..Default::default()
        };
        let catalog = PatternCatalog::with_config(&config).unwrap();
        let builtin = PatternCatalog::builtin().len();
        assert_eq!(catalog.len(), builtin + 2);
        assert_eq!(catalog.rules()[builtin].name(), "extra_sidecar");
        assert!(catalog.rules()[builtin].is_ignore());

        let outcome = catalog.rules()[builtin + 1].apply(&candidate("BNWL_18740101.xml"));
        match outcome {
            Some(RuleOutcome::Extract(fields)) => assert_eq!(fields.day.as_deref(), Some("01")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(catalog.rules()[builtin].apply(&candidate("INDEX.LST")).is_some());
    }

    #[test]
    fn config_rule_name_clash_is_rejected() {
        let config = WranglerConfig {
            extra_rules: vec![RuleConfig {
                name: "sidecar".to_string(),
                kind: RuleConfigKind::Ignore,
                target: RuleTarget::Name,
                pattern: r"\.bak$".to_string(),
                reason: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            PatternCatalog::with_config(&config),
            Err(ScoutError::Config(_))
        ));
    }

    #[test]
    fn outcomes_agree_on_destination() {
        let a = RuleOutcome::Extract(extracted("service_file", "BNWL/1874/01/01/service/WO1_BNWL_1874_01_01-0001-001.xml"));
        let b = RuleOutcome::Extract(extracted("dated_directory", "BNWL/1874/01/01/service/WO1_BNWL_1874_01_01-0001-001.xml"));
        assert!(a.agrees_with(&b));
        assert!(!a.agrees_with(&RuleOutcome::Ignore("x".to_string())));
    }
}
