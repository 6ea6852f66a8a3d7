//! Title code → catalog code lookup table
//!
//! The reference file is pipe-delimited with a header row:
//!
//! ```text
//! title|nlp|start_day|start_month|start_year|end_day|end_month|end_year
//! BNWL|38|1|January|1800|31|December|1900
//! ```
//!
//! A title may appear on several rows with disjoint date ranges when its
//! catalog code changed over time.

use crate::error::{Result, ScoutError};
use chrono::NaiveDate;
use jisc_ids::{CatalogCode, TitleCode};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_LOOKUP_FILE: &str = "data/title_code_lookup.csv";
const DELIMITER: u8 = b'|';
const FIELD_COUNT: usize = 8;

/// One catalog code and the dates it is valid for (`None` = always)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub catalog_code: CatalogCode,
    pub valid: Option<(NaiveDate, NaiveDate)>,
}

impl CatalogEntry {
    fn covers(&self, date: NaiveDate) -> bool {
        match self.valid {
            Some((start, end)) => start <= date && date <= end,
            None => true,
        }
    }
}

/// Read-only mapping from title codes to catalog codes
#[derive(Debug, Clone, Default)]
pub struct TitleCodeTable {
    entries: HashMap<TitleCode, Vec<CatalogEntry>>,
}

impl TitleCodeTable {
    /// Load the pipe-delimited lookup file
    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| ScoutError::Lookup(format!("{}: {}", path.display(), e)))?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), titles = table.len(), "Loaded title code lookup");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut table = Self::default();
        for (index, row) in csv_reader.records().enumerate() {
            let row = row?;
            // +2: one for the header, one for 1-based numbering
            let line = index + 2;
            if row.len() < FIELD_COUNT {
                return Err(ScoutError::Lookup(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    FIELD_COUNT,
                    row.len()
                )));
            }
            let title = TitleCode::parse(&row[0])
                .map_err(|e| ScoutError::Lookup(format!("line {}: {}", line, e)))?;
            let catalog_code = CatalogCode::parse(&row[1])
                .map_err(|e| ScoutError::Lookup(format!("line {}: {}", line, e)))?;
            let start = parse_lookup_date(&row[2], &row[3], &row[4])
                .map_err(|e| ScoutError::Lookup(format!("line {}: start date: {}", line, e)))?;
            let end = parse_lookup_date(&row[5], &row[6], &row[7])
                .map_err(|e| ScoutError::Lookup(format!("line {}: end date: {}", line, e)))?;
            if start > end {
                return Err(ScoutError::Lookup(format!(
                    "line {}: start {} is after end {}",
                    line, start, end
                )));
            }
            table.insert(
                title,
                CatalogEntry {
                    catalog_code,
                    valid: Some((start, end)),
                },
            );
        }
        Ok(table)
    }

    /// Build a table of undated entries
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = Self::default();
        for (title, code) in pairs {
            table.insert(
                TitleCode::parse(title)?,
                CatalogEntry {
                    catalog_code: CatalogCode::parse(code)?,
                    valid: None,
                },
            );
        }
        Ok(table)
    }

    fn insert(&mut self, title: TitleCode, entry: CatalogEntry) {
        self.entries.entry(title).or_default().push(entry);
    }

    /// Catalog code for a title on a given issue date.
    ///
    /// Without a date, undated entries win; otherwise the title must map to
    /// a single code.
    pub fn lookup(&self, title: &TitleCode, date: Option<NaiveDate>) -> Result<&CatalogCode> {
        let entries = self
            .entries
            .get(title)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ScoutError::UnknownTitleCode(title.to_string()))?;

        let found = match date {
            Some(date) => entries.iter().find(|e| e.covers(date)),
            None => entries.iter().find(|e| e.valid.is_none()).or_else(|| {
                let first = &entries[0];
                entries
                    .iter()
                    .all(|e| e.catalog_code == first.catalog_code)
                    .then_some(first)
            }),
        };

        found.map(|e| &e.catalog_code).ok_or_else(|| ScoutError::NoCatalogCodeForDate {
            title_code: title.to_string(),
            date: date.map(|d| d.to_string()).unwrap_or_else(|| "unknown date".to_string()),
        })
    }

    pub fn contains(&self, title: &TitleCode) -> bool {
        self.entries.contains_key(title)
    }

    /// Number of distinct title codes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Days are zero-padded to two digits; month names are cut to their first
/// three letters (`September` → `Sep`).
fn parse_lookup_date(day: &str, month: &str, year: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    let month: String = month.chars().take(3).collect();
    let text = format!("{:0>2}-{}-{}", day, month, year);
    NaiveDate::parse_from_str(&text, "%d-%b-%Y")
}
