//! Configuration file for the wrangler
//!
//! Everything here is optional: the CLI flags cover a normal run. The file
//! exists so that operators can extend the pattern catalog with new mangled
//! layouts without touching the built-in rules.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for JISC Wrangler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WranglerConfig {
    /// Default working directory for logs and listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Default title code lookup file for `rewrite-ids`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_file: Option<String>,

    /// Additional exact file names to ignore (case-insensitive)
    #[serde(default)]
    pub extra_sidecar_names: Vec<String>,

    /// Rules appended after the built-in catalog (lower priority)
    #[serde(default)]
    pub extra_rules: Vec<RuleConfig>,
}

/// A user-defined pattern rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub kind: RuleConfigKind,
    #[serde(default)]
    pub target: RuleTarget,
    /// Regex; extract rules need named groups `title`, `year`, `month`, `day`
    pub pattern: String,
    /// Reason recorded for ignore rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleConfigKind {
    Extract,
    Ignore,
}

/// What a rule's regex is applied to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// The file name only
    #[default]
    Name,
    /// The `/`-separated path relative to the input root
    Path,
}

impl WranglerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WranglerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
