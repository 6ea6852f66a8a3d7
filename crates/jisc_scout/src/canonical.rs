//! Canonical output paths
//!
//! `<output_root>/<TITLE>/<YYYY>/<MM>/<DD>/<file name>` computed purely from
//! the extracted fields. Identical fields always give identical paths, which
//! is what duplicate detection relies on.

use crate::error::{Result, ScoutError};
use crate::types::ExtractedFields;
use jisc_ids::TitleCode;
use std::path::{Path, PathBuf};

/// A validated destination for one matched file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath {
    pub title_code: TitleCode,
    pub year: String,
    pub month: String,
    pub day: String,
    pub file_name: String,
    pub path: PathBuf,
}

impl CanonicalPath {
    /// Directory the file lands in
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

/// Build the canonical path for a matched file.
///
/// `original_name` is used unless the fields carry a replacement name.
/// Missing or badly shaped fields are a [`ScoutError::Validation`].
pub fn build(fields: &ExtractedFields, original_name: &str, output_root: &Path) -> Result<CanonicalPath> {
    let title = required(&fields.title_code, "title_code")?;
    let year = required(&fields.year, "year")?;
    let month = required(&fields.month, "month")?;
    let day = required(&fields.day, "day")?;

    let title_code = TitleCode::parse(title).map_err(|e| ScoutError::Validation(e.to_string()))?;
    check_number("year", year, 4, 0..=9999)?;
    check_number("month", month, 2, 1..=12)?;
    check_number("day", day, 2, 1..=31)?;

    let file_name = fields.output_name.as_deref().unwrap_or(original_name);
    check_file_name(file_name)?;

    let path = output_root
        .join(title_code.as_str())
        .join(year)
        .join(month)
        .join(day)
        .join(file_name);

    Ok(CanonicalPath {
        title_code,
        year: year.to_string(),
        month: month.to_string(),
        day: day.to_string(),
        file_name: file_name.to_string(),
        path,
    })
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ScoutError::Validation(format!("missing {}", field)))
}

fn check_number(field: &str, value: &str, width: usize, range: std::ops::RangeInclusive<u32>) -> Result<()> {
    if value.len() != width || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScoutError::Validation(format!(
            "{} '{}' is not {} digits",
            field, value, width
        )));
    }
    let n: u32 = value
        .parse()
        .map_err(|_| ScoutError::Validation(format!("{} '{}' is not a number", field, value)))?;
    if !range.contains(&n) {
        return Err(ScoutError::Validation(format!("{} '{}' out of range", field, value)));
    }
    Ok(())
}

fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(ScoutError::Validation(format!("invalid file name '{}'", name)));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ScoutError::Validation(format!("file name '{}' contains a separator", name)));
    }
    // Lossy conversion of a non-UTF-8 name; copying under it would rename the file
    if name.contains('\u{FFFD}') {
        return Err(ScoutError::Validation(format!("file name '{}' is not valid UTF-8", name)));
    }
    Ok(())
}
