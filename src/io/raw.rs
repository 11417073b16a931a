//! Raw statement extraction.
//!
//! Statements are CSV files with an `asset_type,value` body. The statement date
//! is not a column; it is embedded in the filename (`2024-06-30_broker.csv`,
//! `bank_20240630.csv`). Files are independent, so extraction fans out over a
//! fixed-size rayon pool and joins once at the end.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::domain::RawAssetRow;
use crate::error::PipelineError;
use crate::io::ingest::{normalize_headers, reader_for};
use crate::text::normalize_label;

/// One statement file and its embedded date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// First `YYYY-MM-DD` or `YYYYMMDD` run in the file stem.
pub fn statement_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let bytes = stem.as_bytes();
    for start in 0..bytes.len() {
        if !bytes[start].is_ascii_digit() || (start > 0 && bytes[start - 1].is_ascii_digit()) {
            continue;
        }
        for (len, fmt) in [(10, "%Y-%m-%d"), (8, "%Y%m%d")] {
            let Some(candidate) = stem.get(start..start + len) else {
                continue;
            };
            let followed_by_digit = bytes.get(start + len).is_some_and(u8::is_ascii_digit);
            if followed_by_digit {
                continue;
            }
            if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
                return Some(date);
            }
        }
    }
    None
}

/// Every dated `.csv` statement in `dir`, ascending by date then path.
pub fn list_statements(dir: &Path) -> Result<Vec<Statement>, PipelineError> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        match statement_date(&path) {
            Some(date) => out.push(Statement { date, path }),
            None => warn!("skipping '{}': no date in the file name", path.display()),
        }
    }
    out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
    Ok(out)
}

pub fn latest_raw_date(statements: &[Statement]) -> Option<NaiveDate> {
    statements.iter().map(|s| s.date).max()
}

/// Parse a statement amount: `¥1,234,567`, `1234.5`, `-3,000円`.
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥' | '円' | ' ' | '\u{3000}'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Extract the valuation lines of one statement.
pub fn parse_statement(statement: &Statement) -> Result<Vec<RawAssetRow>, PipelineError> {
    let path = &statement.path;
    let file = fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = reader_for(file);
    let headers = normalize_headers(reader.headers().map_err(|e| PipelineError::csv(path, e))?);
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::data_load(format!("'{}': missing column `{name}`", path.display())))
    };
    let asset_col = column("asset_type")?;
    let value_col = column("value")?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = record.map_err(|e| PipelineError::csv(path, e))?;
        let asset_type = normalize_label(record.get(asset_col).unwrap_or_default());
        if asset_type.is_empty() {
            continue;
        }
        let raw_value = record.get(value_col).unwrap_or_default();
        let value = parse_amount(raw_value).ok_or_else(|| {
            PipelineError::data_load(format!(
                "'{}' line {line}: cannot parse value {raw_value:?} for '{asset_type}'",
                path.display()
            ))
        })?;
        rows.push(RawAssetRow {
            date: statement.date,
            asset_type,
            value,
        });
    }
    debug!("'{}': {} rows", path.display(), rows.len());
    Ok(rows)
}

/// Parse `statements` on a pool of `workers` threads.
///
/// One task per file; the partial tables are concatenated in input order after
/// every task has finished. The first failing file fails the whole extraction.
pub fn extract_statements(statements: &[Statement], workers: usize) -> Result<Vec<RawAssetRow>, PipelineError> {
    if statements.is_empty() {
        return Ok(Vec::new());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| PipelineError::data_load(format!("cannot start extraction pool: {e}")))?;

    let partials: Vec<Vec<RawAssetRow>> =
        pool.install(|| statements.par_iter().map(parse_statement).collect::<Result<_, _>>())?;

    let rows: Vec<RawAssetRow> = partials.into_iter().flatten().collect();
    info!(
        "extracted {} rows from {} statement(s) on {} worker(s)",
        rows.len(),
        statements.len(),
        workers.max(1)
    );
    Ok(rows)
}
