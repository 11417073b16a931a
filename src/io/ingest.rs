//! CSV ingest.
//!
//! Every table on disk goes through `read_csv`:
//! - headers are normalized (BOM stripped, trimmed, lowercased, spaces to `_`)
//!   so spreadsheet exports match the serde field names
//! - each row is deserialized on its own; failures are collected with their
//!   line numbers and reported together
//! - any row error fails the load, since a half-read master is worse than none

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::domain::{AssetRecord, Calendar, LedgerRow};
use crate::error::PipelineError;

/// Row errors listed in the load error before it is truncated.
const MAX_REPORTED_ROW_ERRORS: usize = 5;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Excel writes UTF-8 CSVs with a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase().replace(' ', "_")
}

pub(crate) fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers.iter().map(normalize_header_name).collect()
}

fn open(path: &Path) -> Result<File, PipelineError> {
    File::open(path).map_err(|e| PipelineError::io(path, e))
}

pub(crate) fn reader_for(file: File) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file)
}

/// Deserialize every row of `path` into `T`.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let mut reader = reader_for(open(path)?);
    let headers = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .clone();
    reader.set_headers(normalize_headers(&headers));

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        // records start on line 2, after the header
        let line = idx + 2;
        match result {
            Ok(row) => rows.push(row),
            Err(e) => row_errors.push(RowError {
                line,
                message: e.to_string(),
            }),
        }
    }

    if !row_errors.is_empty() {
        let shown: Vec<String> = row_errors
            .iter()
            .take(MAX_REPORTED_ROW_ERRORS)
            .map(|e| format!("line {}: {}", e.line, e.message))
            .collect();
        let more = row_errors.len().saturating_sub(MAX_REPORTED_ROW_ERRORS);
        let suffix = if more > 0 { format!(" (+{more} more)") } else { String::new() };
        return Err(PipelineError::data_load(format!(
            "'{}': {} bad row(s): {}{suffix}",
            path.display(),
            row_errors.len(),
            shown.join("; ")
        )));
    }

    debug!("read {} rows from '{}'", rows.len(), path.display());
    Ok(rows)
}

/// Like `read_csv`, but a missing file is an empty table.
///
/// Used for outputs of earlier runs, which do not exist on the first run.
pub fn read_csv_or_empty<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    match read_csv(path) {
        Err(PipelineError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            debug!("'{}' does not exist yet; starting empty", path.display());
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Ledger rows for every year touched by `calendar`, from `<dir>/<year>.csv`.
///
/// Missing year files are skipped with a warning; no rows at all is a load error.
pub fn load_ledger(dir: &Path, calendar: &Calendar) -> Result<Vec<LedgerRow>, PipelineError> {
    use chrono::Datelike;

    let mut rows = Vec::new();
    for year in calendar.start().year()..=calendar.end().year() {
        let path = dir.join(format!("{year}.csv"));
        if !path.exists() {
            warn!("ledger for {year} not found at '{}'", path.display());
            continue;
        }
        rows.extend(read_csv::<LedgerRow>(&path)?);
    }
    if rows.is_empty() {
        return Err(PipelineError::data_load(format!(
            "no ledger rows under '{}' for {}..={}",
            dir.display(),
            calendar.start(),
            calendar.end()
        )));
    }
    Ok(rows)
}

/// Previously aggregated asset table, empty on the first run.
pub fn load_asset_table(path: &Path) -> Result<Vec<AssetRecord>, PipelineError> {
    read_csv_or_empty(path)
}

/// Latest date in a table, `None` if it is empty.
pub fn max_date<T, F>(rows: &[T], date_of: F) -> Option<NaiveDate>
where
    F: Fn(&T) -> NaiveDate,
{
    rows.iter().map(date_of).max()
}
