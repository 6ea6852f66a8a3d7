//! Error types for the wrangler engine

use std::io;
use thiserror::Error;

/// Scout error type
///
/// `Config`, and the TOML and lookup variants raised while loading settings,
/// stop a run before it starts. Every other variant is caught at the
/// per-file boundary and recorded in the audit trail.
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),


    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Identifier error: {0}")]
    Id(#[from] jisc_ids::IdParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown title code: {0}")]
    UnknownTitleCode(String),

    #[error("No catalog code for title {title_code} on {date}")]
    NoCatalogCodeForDate { title_code: String, date: String },

    #[error("Lookup table error: {0}")]
    Lookup(String),

    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("Missing companion file: {0}")]
    MissingCompanion(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScoutError>;
