//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use jisc_scout::ScoutError;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Input directory does not exist
    pub fn path_not_found(path: &Path) -> Self {
        Self::new(format!("Input directory not found: {}", path.display()))
            .with_context("The specified path does not exist on the filesystem")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Verify you have read permissions for this path".to_string(),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// Input path exists but is not a directory
    pub fn not_a_directory(path: &Path) -> Self {
        Self::new(format!("Not a directory: {}", path.display()))
            .with_context("The input must be the root of a directory tree")
            .with_suggestion(format!(
                "TRY: Use the parent directory: {}",
                path.parent().map(|p| p.display().to_string()).unwrap_or_else(|| ".".to_string())
            ))
    }

    /// Directory layout rejected before any file was touched
    pub fn invalid_run(err: &ScoutError) -> Self {
        let message = match err {
            ScoutError::Config(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self::new(format!("Cannot start run: {}", message))
            .with_context("Input, output and working directories must not contain one another")
            .with_suggestions([
                "TRY: Choose an output directory outside the input tree".to_string(),
                "TRY: Pass --working-dir to keep logs away from the input and output".to_string(),
            ])
    }

    /// Settings file could not be read or parsed
    pub fn config_file(path: &Path, err: &ScoutError) -> Self {
        Self::new(format!("Cannot load config file: {}", path.display()))
            .with_context(err.to_string())
            .with_suggestions([
                "TRY: Check the file is valid TOML".to_string(),
                "TRY: Rules need name, kind (extract|ignore) and pattern".to_string(),
            ])
    }

    /// Title code lookup could not be loaded
    pub fn lookup_file(path: &Path, err: &ScoutError) -> Self {
        Self::new(format!("Cannot load title code lookup: {}", path.display()))
            .with_context(err.to_string())
            .with_suggestions([
                "TRY: Pass the lookup file explicitly with --lookup FILE".to_string(),
                "TRY: Rows are title|nlp|start_day|start_month|start_year|end_day|end_month|end_year"
                    .to_string(),
            ])
    }

    /// Output tree already has content
    pub fn output_not_empty(path: &Path) -> Self {
        Self::new(format!("Output directory is not empty: {}", path.display()))
            .with_context("rewrite-ids writes into a fresh directory so counts can be checked")
            .with_suggestion("TRY: Choose a new output directory, or empty this one first")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ref ctx) = self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
