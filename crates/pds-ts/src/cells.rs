//! Row and field rules shared by both series backends.
//!
//! A file reads the same way whichever backend holds it:
//!
//! - a row whose fields are all empty is skipped;
//! - every other row has exactly one field per header column;
//! - coordinates are non-negative integers, and `1.0` is accepted as `1`;
//! - an empty value cell is a missing value, anything else must parse as a
//!   number.
//!
//! Every row is checked when the series is opened, so a malformed row fails
//! the open even if no lookup would ever reach it.
//!
//! Errors are returned as messages without the file path; callers prefix it.

use std::collections::HashSet;

use csv::StringRecord;

/// Leading columns holding the (stage, run, interval) coordinate.
pub const COORDINATE_COLUMNS: usize = 3;

/// Names used in messages for the three coordinate columns.
pub(crate) const COORDINATE_NAMES: [&str; COORDINATE_COLUMNS] = ["stage", "run", "interval"];

pub(crate) fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Entity names of a header row, trimmed.
pub(crate) fn entities<'a>(
    header: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<String>, String> {
    let mut names: Vec<String> = header
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    if names.len() <= COORDINATE_COLUMNS {
        return Err(format!(
            "series needs {} coordinate columns and at least one value column, found {} columns",
            COORDINATE_COLUMNS,
            names.len()
        ));
    }
    let entities = names.split_off(COORDINATE_COLUMNS);
    let mut seen = HashSet::new();
    for name in &entities {
        if !seen.insert(name.as_str()) {
            return Err(format!("entity column '{}' appears more than once", name));
        }
    }
    Ok(entities)
}

pub(crate) fn check_width(record: &StringRecord, width: usize, line: usize) -> Result<(), String> {
    if record.len() == width {
        Ok(())
    } else {
        Err(format!(
            "line {}: expected {} fields, found {}",
            line,
            width,
            record.len()
        ))
    }
}

/// Coordinates are integral; exports sometimes write them as `1.0`.
pub(crate) fn integral(value: f64) -> Option<u32> {
    if value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

pub(crate) fn coordinate(raw: &str, column: usize, line: usize) -> Result<u32, String> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(integral))
        .ok_or_else(|| coordinate_error(column, line, raw))
}

/// Same rule for a coordinate already stored as a number.
pub(crate) fn numeric_coordinate(
    value: Option<f64>,
    column: usize,
    line: usize,
) -> Result<u32, String> {
    value.and_then(integral).ok_or_else(|| {
        let shown = value.map(|v| v.to_string()).unwrap_or_default();
        coordinate_error(column, line, &shown)
    })
}

fn coordinate_error(column: usize, line: usize, raw: &str) -> String {
    format!(
        "line {}: {} must be a non-negative integer, got '{}'",
        line, COORDINATE_NAMES[column], raw
    )
}

pub(crate) fn value(raw: &str, entity: &str, line: usize) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| {
        format!(
            "line {}: value '{}' for '{}' is not a number",
            line, raw, entity
        )
    })
}
